//! Line-style patches that have no direct store setter.

use crate::model::handle::Handle;
use crate::store::ObjectStore;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_OPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(<lineStyle\b[^>]*\bopacity=")(\d+)(")"#).expect("valid line opacity regex")
});

/// Fully opaque line.
pub const OPAQUE_LINE: u8 = 255;

/// Rewrites the line opacity of `handle` through its XML description.
///
/// Returns `false` without touching the store when the object is missing or
/// its XML carries no line opacity.
pub fn patch_line_opacity(store: &dyn ObjectStore, handle: &Handle, opacity: u8) -> bool {
    let Some(xml) = store.xml(handle) else {
        debug!("event=patch_line_opacity module=scene status=skip reason=no_xml handle={handle}");
        return false;
    };
    if !LINE_OPACITY_RE.is_match(&xml) {
        debug!(
            "event=patch_line_opacity module=scene status=skip reason=no_line_style handle={handle}"
        );
        return false;
    }

    let patched = LINE_OPACITY_RE.replace(&xml, |captures: &regex::Captures<'_>| {
        format!("{}{opacity}{}", &captures[1], &captures[3])
    });
    store.eval_xml(&patched);
    true
}

#[cfg(test)]
mod tests {
    use super::{patch_line_opacity, OPAQUE_LINE};
    use crate::model::handle::Handle;
    use crate::store::memory::InMemoryStore;
    use crate::store::ObjectStore;

    #[test]
    fn rewrites_only_the_line_opacity() {
        let store = InMemoryStore::default();
        store.submit_creation_command("V_{D1} = Segment((x(F_{D1}), 0), F_{D1})");
        let handle = Handle::from("V_{D1}");

        assert!(patch_line_opacity(&store, &handle, OPAQUE_LINE));
        let object = store.object(&handle).expect("segment exists");
        assert_eq!(object.line_opacity, OPAQUE_LINE);
        let xml = store.xml(&handle).expect("xml exists");
        assert!(xml.contains(r#"thickness="5""#));
    }

    #[test]
    fn missing_object_is_a_no_op() {
        let store = InMemoryStore::default();
        assert!(!patch_line_opacity(&store, &Handle::from("ghost"), OPAQUE_LINE));
        assert!(store.calls().is_empty());
    }
}
