use crate::model::ResourcePath;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

///
/// TargetQuery
///
/// What the index store needs from a query definition: full equality and a
/// derived canonical id. The canonical id is an index key only; it may map
/// several unequal queries to the same string.
///

pub trait TargetQuery: Clone + fmt::Debug + Eq + Serialize + DeserializeOwned {
    fn canonical_id(&self) -> String;
}

///
/// FilterOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FilterOp {
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
    GreaterThanOrEqual,
    GreaterThan,
    ArrayContains,
    In,
}

impl FilterOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThanOrEqual => ">=",
            Self::GreaterThan => ">",
            Self::ArrayContains => "array_contains",
            Self::In => "in",
        }
    }
}

///
/// FilterValue
///
/// Literal compared against a field. Renders without a type tag in canonical
/// ids, so `Text("1")` and `Integer(1)` render identically.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    List(Vec<FilterValue>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

///
/// FieldFilter
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

///
/// Direction
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

///
/// OrderBy
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

///
/// Query
///
/// Listen query over one collection (or a collection group below a path).
/// Built with the chaining helpers; equality is structural.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Query {
    path: ResourcePath,
    collection_group: Option<String>,
    filters: Vec<FieldFilter>,
    order_by: Vec<OrderBy>,
    limit: Option<u32>,
}

impl Query {
    /// Query rooted at `path` with no constraints.
    #[must_use]
    pub const fn at(path: ResourcePath) -> Self {
        Self {
            path,
            collection_group: None,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn collection_group(mut self, group: impl Into<String>) -> Self {
        self.collection_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn path(&self) -> &ResourcePath {
        &self.path
    }

    #[must_use]
    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    #[must_use]
    pub fn explicit_order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    #[must_use]
    pub const fn limit_value(&self) -> Option<u32> {
        self.limit
    }
}

impl TargetQuery for Query {
    fn canonical_id(&self) -> String {
        let mut id = self.path.canonical_string();

        if let Some(group) = &self.collection_group {
            id.push_str("|cg:");
            id.push_str(group);
        }

        id.push_str("|f:");
        for filter in &self.filters {
            id.push_str(&filter.field);
            id.push_str(filter.op.as_str());
            id.push_str(&filter.value.to_string());
        }

        id.push_str("|ob:");
        for order in &self.order_by {
            id.push_str(&order.field);
            id.push_str(order.direction.as_str());
        }

        if let Some(limit) = self.limit {
            id.push_str("|l:");
            id.push_str(&limit.to_string());
        }

        id
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms() -> ResourcePath {
        ResourcePath::parse("rooms").unwrap()
    }

    #[test]
    fn canonical_id_renders_every_component() {
        let query = Query::at(rooms())
            .filter("size", FilterOp::GreaterThan, FilterValue::Integer(3))
            .order_by("size", Direction::Descending)
            .limit(10);

        assert_eq!(query.canonical_id(), "rooms|f:size>3|ob:sizedesc|l:10");
    }

    #[test]
    fn builder_keeps_clauses_in_call_order() {
        let query = Query::at(rooms())
            .filter("a", FilterOp::Equal, FilterValue::Integer(1))
            .filter("b", FilterOp::LessThan, FilterValue::Integer(2))
            .order_by("a", Direction::Ascending);

        let fields: Vec<_> = query.filters().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, ["a", "b"]);
        assert_eq!(query.filters()[1].op, FilterOp::LessThan);
        assert_eq!(query.explicit_order_by().len(), 1);
        assert_eq!(query.limit_value(), None);
        assert_eq!(query.path(), &rooms());
    }

    #[test]
    fn canonical_id_includes_collection_group() {
        let query = Query::at(ResourcePath::default()).collection_group("messages");

        assert_eq!(query.canonical_id(), "|cg:messages|f:|ob:");
    }

    #[test]
    fn untyped_rendering_collides_for_unequal_queries() {
        let text = Query::at(rooms()).filter(
            "a",
            FilterOp::Equal,
            FilterValue::Text("1".to_string()),
        );
        let int = Query::at(rooms()).filter("a", FilterOp::Equal, FilterValue::Integer(1));

        assert_ne!(text, int);
        assert_eq!(text.canonical_id(), int.canonical_id());
    }

    #[test]
    fn list_values_render_comma_separated() {
        let query = Query::at(rooms()).filter(
            "tag",
            FilterOp::In,
            FilterValue::List(vec![FilterValue::Bool(true), FilterValue::Null]),
        );

        assert_eq!(query.canonical_id(), "rooms|f:tagin[true,null]|ob:");
    }
}
