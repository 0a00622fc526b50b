//! Whitelist HTML sanitizer and locked-down preview shell.
//!
//! Sanitization is allow-list based: unknown tags are dropped entirely,
//! known tags keep only allow-listed attributes, and `href`/`src` survive
//! only when URL resolution against a fixed base yields an http(s) scheme.
//! SVG is blocked wholesale rather than sanitized. The result is wrapped
//! in a document shell whose CSP denies all default sources and permits
//! inline styles only through a single-use random nonce.

use once_cell::sync::Lazy;
use rand::RngCore;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use url::Url;

use patchforge_core::types::now_millis;
use patchforge_core::{PatchError, SandboxPreview, SanitizeReport};

/// Input byte ceiling for a preview render.
pub const MAX_PREVIEW_INPUT: usize = 100 * 1024;

/// Cap on processed tags per render; bounds rewrite cost on tag-dense
/// adversarial input independently of the byte ceiling.
pub const MAX_TAGS: usize = 5_000;

const SAFE_TAGS: &[&str] = &[
    "div", "span", "p", "b", "i", "strong", "em", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5",
    "h6", "br", "hr", "pre", "code", "img", "a",
];

fn allowed_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "title", "rel", "target"],
        "img" => &["src", "alt"],
        _ => &[],
    }
}

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([a-zA-Z0-9]+)([^>]*)>").expect("tag pattern"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z0-9\-:_]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern")
});
static SCRIPT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script pattern"));
static SCRIPT_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script").expect("pattern"));
static EVENT_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("pattern"));
static IFRAME_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<iframe").expect("pattern"));
static SVG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<svg|data:\s*image/svg\+xml|data:image/svg").expect("svg pattern")
});

/// Render a sanitized, policy-wrapped preview of untrusted HTML.
pub fn generate(html: &str) -> Result<SandboxPreview, PatchError> {
    if html.len() > MAX_PREVIEW_INPUT {
        return Err(PatchError::InputTooLarge {
            size: html.len(),
            limit: MAX_PREVIEW_INPUT,
        });
    }

    // SVG is rejected outright, never partially sanitized: it is a rich
    // enough vector that allow-listing inside it is unreliable.
    if SVG_RE.is_match(html) {
        warn!("preview input contains embedded SVG; render refused");
        return Err(PatchError::SvgBlocked);
    }

    let sanitized = sanitize(html);
    let nonce = style_nonce();
    let wrapped = wrap_document(&sanitized, &nonce);

    let report = SanitizeReport {
        removed_scripts: SCRIPT_MARKER_RE.is_match(html),
        removed_events: EVENT_MARKER_RE.is_match(html),
        removed_iframes: IFRAME_MARKER_RE.is_match(html),
        removed_svg: false,
        size_original: html.len(),
        size_final: wrapped.len(),
        timestamp: now_millis(),
    };

    debug!(
        size_original = report.size_original,
        size_final = report.size_final,
        "preview rendered"
    );

    Ok(SandboxPreview {
        html: wrapped,
        report,
    })
}

/// Allow-list rewrite of every tag in the input. Script blocks are removed
/// including their text content first, so script bodies never surface as
/// visible preview text.
fn sanitize(html: &str) -> String {
    let stripped = SCRIPT_BLOCK_RE.replace_all(html, "");

    let mut tag_count = 0usize;
    TAG_RE
        .replace_all(&stripped, |caps: &Captures| {
            let raw = &caps[0];
            let tag = caps[1].to_lowercase();

            if !SAFE_TAGS.contains(&tag.as_str()) {
                return String::new();
            }

            tag_count += 1;
            if tag_count > MAX_TAGS {
                return String::new();
            }

            if raw.starts_with("</") {
                return format!("</{tag}>");
            }

            let allowed = allowed_attrs(&tag);
            let mut kept = String::new();
            for attr in ATTR_RE.captures_iter(&caps[2]) {
                let name = attr[1].to_lowercase();
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                if !allowed.contains(&name.as_str()) {
                    continue;
                }
                if (name == "href" || name == "src") && !is_safe_url(value) {
                    continue;
                }
                kept.push_str(&format!(" {name}=\"{value}\""));
            }

            format!("<{tag}{kept}>")
        })
        .into_owned()
}

/// Scheme check by URL resolution, not regex: `javascript:`, `data:`, and
/// relative-path escapes all fall out of the same rule.
fn is_safe_url(value: &str) -> bool {
    static BASE: Lazy<Url> = Lazy::new(|| Url::parse("http://base/").expect("static base url"));
    match BASE.join(value) {
        Ok(resolved) => matches!(resolved.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// 128-bit nonce from the OS CSPRNG, hex-encoded. Generated once per
/// render and never reused.
fn style_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn wrap_document(content: &str, nonce: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta http-equiv="Content-Security-Policy"
          content="
            default-src 'none';
            img-src 'self';
            style-src 'nonce-{nonce}';
            font-src 'self';
            connect-src 'none';
            media-src 'none';
            object-src 'none';
            frame-ancestors 'none';
            base-uri 'none';
          ">

    <style nonce="{nonce}">
        body {{
            font-family: Arial, sans-serif;
            padding: 20px;
            background: #111;
            color: #fff;
        }}
        .forge-preview {{
            border: 2px solid #0ff;
            padding: 20px;
            border-radius: 8px;
            background: #222;
            word-break: break-word;
        }}
    </style>
</head>

<body>
    <div class="forge-preview">
        {content}
    </div>
</body>
</html>"#
    )
}
