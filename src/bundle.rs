//! Runtime source bundling.
//!
//! Emits a module that embeds the simulation runtime preamble, epilogue and
//! drawing stylesheet as JSON-quoted string constants.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Inputs to one bundle.
#[derive(Debug, Clone, Copy)]
pub struct BundleSources<'a> {
    pub preamble: &'a Path,
    pub epilogue: &'a Path,
    pub draw_css: &'a Path,
}

const HEADER: &str = "\
// Copyright 2015 Bobby Powers. All rights reserved.
// Use of this source code is governed by the MIT
// license that can be found in the LICENSE file.

'use strict';

/* tslint:disable: max-line-length */
";

/// Wraps stylesheet text for inlining into an SVG document.
pub fn wrap_draw_css(css: &str) -> String {
    format!("<defs><style>\n/* <![CDATA[ */\n{css}\n/* ]]> */\n</style></defs>\n")
}

fn slurp(path: &Path) -> Result<String> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text.trim().to_string())
}

fn quote(text: &str) -> Result<String> {
    serde_json::to_string(text).context("Failed to encode string literal")
}

/// Renders the module from already-loaded payloads.
pub fn render(
    sources: BundleSources<'_>,
    preamble: &str,
    epilogue: &str,
    draw_css: &str,
) -> Result<String> {
    let constants = [
        ("preamble", sources.preamble, preamble),
        ("epilogue", sources.epilogue, epilogue),
        ("drawCSS", sources.draw_css, draw_css),
    ];

    let mut out = String::from(HEADER);
    for (name, path, payload) in constants {
        out.push('\n');
        out.push_str(&format!(
            "// unquoted source in '{}'\nexport const {name} = {};\n",
            path.display(),
            quote(payload)?
        ));
    }
    Ok(out)
}

/// Reads, trims and quotes each source into the runtime module.
pub fn bundle_runtime(sources: BundleSources<'_>) -> Result<String> {
    let preamble = slurp(sources.preamble)?;
    let epilogue = slurp(sources.epilogue)?;
    let draw_css = wrap_draw_css(&slurp(sources.draw_css)?);
    render(sources, &preamble, &epilogue, &draw_css)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_wrap_draw_css() {
        assert_eq!(
            wrap_draw_css("a{}"),
            "<defs><style>\n/* <![CDATA[ */\na{}\n/* ]]> */\n</style></defs>\n"
        );
    }

    #[test]
    fn test_bundle_quotes_trimmed_sources() {
        let tmp = TempDir::new().unwrap();
        let pre = tmp.path().join("runtime.js");
        let epi = tmp.path().join("epilogue.js");
        let css = tmp.path().join("draw.css");
        fs::write(&pre, "\n  var s = \"x\";\n").unwrap();
        fs::write(&epi, "main();\n").unwrap();
        fs::write(&css, "text { fill: red; }\n").unwrap();

        let out = bundle_runtime(BundleSources {
            preamble: &pre,
            epilogue: &epi,
            draw_css: &css,
        })
        .unwrap();

        assert!(out.starts_with("// Copyright 2015 Bobby Powers."));
        assert!(out.contains(&format!("// unquoted source in '{}'\n", pre.display())));
        assert!(out.contains(r#"export const preamble = "var s = \"x\";";"#));
        assert!(out.contains(r#"export const epilogue = "main();";"#));
        assert!(out.contains(
            r#"export const drawCSS = "<defs><style>\n/* <![CDATA[ */\ntext { fill: red; }\n/* ]]> */\n</style></defs>\n";"#
        ));
    }

    #[test]
    fn test_missing_source() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.js");
        let err = bundle_runtime(BundleSources {
            preamble: &missing,
            epilogue: &missing,
            draw_css: &missing,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
