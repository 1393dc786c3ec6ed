use crate::model::DocumentKey;

///
/// ReferenceDelegate
///
/// Observer told about every membership edge the cache adds or removes
/// through `add_matching_keys` / `remove_matching_keys`. Typically the
/// garbage-collection layer, which refreshes sentinels in response.
/// Notifications are fire-and-forget.
///

pub trait ReferenceDelegate {
    fn add_reference(&mut self, key: &DocumentKey);

    fn remove_reference(&mut self, key: &DocumentKey);
}

///
/// NoopReferenceDelegate
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReferenceDelegate;

impl ReferenceDelegate for NoopReferenceDelegate {
    fn add_reference(&mut self, _: &DocumentKey) {}

    fn remove_reference(&mut self, _: &DocumentKey) {}
}
