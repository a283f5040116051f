//! Live reload by polling.
//!
//! HTML pages get a small script that polls [`RELOAD_PATH`] and reloads the
//! page once the generation number changes. The watcher bumps the
//! generation after every rebuild that wrote output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Endpoint reporting the current generation as JSON.
pub const RELOAD_PATH: &str = "/__assetflow/reload";

/// Poll interval used by the injected script, in milliseconds.
const POLL_INTERVAL_MS: u32 = 1000;

/// Shared rebuild counter.
#[derive(Debug, Clone, Default)]
pub struct ReloadHandle {
    generation: Arc<AtomicU64>,
}

impl ReloadHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Signal connected pages to reload. Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// JSON body served at [`RELOAD_PATH`].
    pub fn status_json(&self) -> String {
        serde_json::json!({ "generation": self.generation() }).to_string()
    }
}

/// The client script injected into HTML pages.
pub fn client_script() -> String {
    format!(
        r#"<script>(function(){{var g=null;function poll(){{fetch("{path}",{{cache:"no-store"}}).then(function(r){{return r.json()}}).then(function(d){{if(g!==null&&d.generation!==g){{location.reload();return}}g=d.generation}}).catch(function(){{}}).then(function(){{setTimeout(poll,{interval})}})}}poll()}})();</script>"#,
        path = RELOAD_PATH,
        interval = POLL_INTERVAL_MS
    )
}

/// Insert the client script before the last `</body>`, or append it.
pub fn inject(html: &str) -> String {
    let script = client_script();
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..idx]);
            out.push_str(&script);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{}{}", html, script),
    }
}
