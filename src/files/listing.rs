//! The generated home page: every file under the docroot with its hit
//! count, plus rate-limiter statistics.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::counters::CounterMode;
use crate::files::resolver::key_for;
use crate::limiter::LimiterStats;

/// Lists every regular file under `root`, as sorted "/"-rooted relative
/// paths with forward slashes.
///
/// `root` must already be canonical. Each entry is listed under the same
/// key the resolver counts it by: symlinks appear as their in-root target,
/// and symlinks leading out of `root` are left out. Symlinked directories
/// are not entered.
pub async fn walk_docroot(root: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }

            let Ok(canonical) = tokio::fs::canonicalize(&path).await else {
                continue;
            };
            let Ok(rel) = canonical.strip_prefix(root) else {
                continue;
            };
            let is_file = match tokio::fs::metadata(&canonical).await {
                Ok(meta) => meta.is_file(),
                Err(_) => false,
            };
            if is_file {
                files.push(key_for(rel));
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Percent-encodes each segment of a "/"-rooted key for use in a link.
fn href_for(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Inputs for [`render_listing`], gathered by the handler.
pub struct ListingPage<'a> {
    pub files: &'a [String],
    pub counts: &'a HashMap<String, u64>,
    pub stats: LimiterStats,
    pub max_requests: usize,
    pub window_seconds: f64,
    pub mode: CounterMode,
}

pub fn render_listing(page: &ListingPage<'_>) -> String {
    let mut rows = String::new();
    for file in page.files {
        let count = page.counts.get(file).copied().unwrap_or(0);
        let href = escape_html(&href_for(file));
        let name = escape_html(file);
        let _ = writeln!(
            rows,
            "<tr><td><a href=\"{href}\">{name}</a></td><td class=\"count\">{count}</td></tr>"
        );
    }
    if rows.is_empty() {
        rows.push_str("<tr><td colspan=\"2\">(empty)</td></tr>\n");
    }

    format!(
        r#"<!doctype html><html><head><meta charset="utf-8"><title>docgate</title>
<style>
body{{font-family:system-ui,Arial,sans-serif;margin:0;background:#fbf6f0;color:#221d10}}
header{{padding:20px;text-align:center;border-bottom:1px solid #e5ddd0}}
.wrap{{max-width:960px;margin:0 auto;padding:20px}}
table{{width:100%;border-collapse:collapse}}
td,th{{border-bottom:1px solid #e5ddd0;padding:8px;text-align:left}}
.count{{text-align:right}}
.stats{{background:#fef2f2;border:1px solid #fecaca;border-radius:8px;padding:12px;margin-top:16px}}
</style></head>
<body>
<header><h1>docgate</h1><div>Rate limit: {max} requests per {window}s per client</div></header>
<div class="wrap">
<h2>Files and requests served</h2>
<table>
<tr><th>Path</th><th class="count">Requests Served</th></tr>
{rows}</table>
<div class="stats">
<strong>Rate limiting</strong><br>
Distinct clients: <span id="clients">{clients}</span><br>
Currently rate-limited: <span id="limited">{limited}</span><br>
Limit: {max} requests per {window} second(s)
</div>
<p>Counter mode: <strong>{mode}</strong></p>
</div>
</body></html>
"#,
        max = page.max_requests,
        window = page.window_seconds,
        rows = rows,
        clients = page.stats.clients,
        limited = page.stats.limited,
        mode = page.mode,
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
