//! JavaScript evaluated inside harvested pages

/// Attribute the snapshot script puts on elements whose computed style hides them
pub const HIDDEN_MARKER: &str = "data-harvest-hidden";

/// Snapshot the rendered page for text extraction
///
/// Computed styles are lost once the DOM is serialized, so every element that
/// is `display:none` or `visibility:hidden` right now is tagged with
/// `data-harvest-hidden` before `outerHTML` is taken. The tags are removed
/// again so the live page is left untouched.
///
/// Evaluates to `{ url, title, html }`.
pub const SNAPSHOT_SCRIPT: &str = r#"
(() => {
    const marker = 'data-harvest-hidden';
    const marked = [];
    try {
        const elements = document.body ? document.body.querySelectorAll('*') : [];
        for (const el of elements) {
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden') {
                el.setAttribute(marker, '');
                marked.push(el);
            }
        }
        return {
            url: window.location.href,
            title: document.title || '',
            html: document.documentElement ? document.documentElement.outerHTML : ''
        };
    } finally {
        for (const el of marked) {
            el.removeAttribute(marker);
        }
    }
})()
"#;
