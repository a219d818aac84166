//! Shared fixtures: a miniature jQuery-like source tree plus stand-ins for
//! git and the minifier.
#![allow(dead_code)]

use anyhow::Result;
use jqbuild::config::Config;
use jqbuild::minify::{Minifier, minified_name};
use jqbuild::vcs::VersionControl;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const WRAPPER: &str = "/*!
 * jQuery JavaScript Library v@VERSION
 * Date: @DATE
 */
/* eslint-disable no-unused-vars */
( function( global, factory ) {
factory( global );
} )( window, function( window ) {
\"use strict\";

// @CODE
// build.js inserts compiled jQuery here

return jQuery;
} );
";

const ENTRY: &str = "define( [
\t\"./core\",
\t\"./selector\",
\t\"./ajax\",
\t\"./ajax/xhr\",
\t\"./css\",
\t\"./effects\",
\t\"./exports/global\",
\t\"./exports/amd\"
], function( jQuery ) {

\"use strict\";

return jQuery;

} );
";

const CORE: &str = "define( [
\t\"./var/arr\"
], function( arr ) {

\"use strict\";

var jQuery = function() {};
jQuery.fn = jQuery.prototype = { jquery: \"@VERSION\" };

return jQuery;
} );
";

const ARR: &str = "define( function() {
\t\"use strict\";

\treturn [];
} );
";

const EXPORTS_AMD: &str = "define( [
\t\"../core\"
], function( jQuery ) {

\"use strict\";

if ( typeof define === \"function\" && define.amd ) {
\tdefine( \"jquery\", [], function() {
\t\treturn jQuery;
\t} );
}

} );
";

/// A plain module: depends on `deps` and runs `body`.
fn module(deps: &[&str], body: &str) -> String {
    let deps = deps
        .iter()
        .map(|dep| format!("\t\"{}\"", dep))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "define( [\n{}\n], function( jQuery ) {{\n\n\"use strict\";\n\n{}\n\n}} );\n",
        deps, body
    )
}

pub struct Fixture {
    pub temp: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let src = temp.path().join("src");

        let files: Vec<(&str, String)> = vec![
            ("wrapper.js", WRAPPER.to_owned()),
            ("jquery.js", ENTRY.to_owned()),
            ("core.js", CORE.to_owned()),
            ("var/arr.js", ARR.to_owned()),
            (
                "selector.js",
                module(&["./core"], "jQuery.find = \"sizzle\";"),
            ),
            (
                "selector-native.js",
                module(&["./core"], "jQuery.find = \"native\";"),
            ),
            (
                "ajax.js",
                module(&["./core", "./deferred"], "jQuery.ajax = function() {};"),
            ),
            (
                "ajax/xhr.js",
                module(&["../core", "../ajax"], "jQuery.ajaxSettings = { xhr: true };"),
            ),
            (
                "deferred.js",
                module(&["./core"], "jQuery.Deferred = function() {};"),
            ),
            (
                "css.js",
                module(&["./core"], "jQuery.fn.css = function() {};"),
            ),
            (
                "effects.js",
                module(&["./core", "./css"], "jQuery.fn.animate = function() {};"),
            ),
            (
                "exports/global.js",
                module(
                    &["../core"],
                    "jQuery.noConflict = function( deep ) {\n\treturn jQuery;\n};",
                ),
            ),
            ("exports/amd.js", EXPORTS_AMD.to_owned()),
        ];

        for (relative, contents) in files {
            let path = src.join(relative);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(path, contents).expect("write fixture module");
        }

        let mut config = Config {
            source_root: src,
            slim_exclude: vec!["effects".to_owned()],
            minifier: Vec::new(),
            ..Config::default()
        };
        // The fixture's ajax has no cross-module rules
        config.overrides.shift_remove("ajax");

        Self { temp, config }
    }

    pub fn dist(&self) -> PathBuf {
        self.temp.path().join("dist")
    }
}

/// Fixed commit metadata instead of asking git.
#[derive(Debug, Clone)]
pub struct FixedCommit {
    pub hash: &'static str,
    pub clean: bool,
}

impl Default for FixedCommit {
    fn default() -> Self {
        Self {
            hash: "abc1234",
            clean: true,
        }
    }
}

impl VersionControl for FixedCommit {
    fn short_commit_hash(&self) -> Result<String> {
        Ok(self.hash.to_owned())
    }

    fn is_working_dir_clean(&self) -> Result<bool> {
        Ok(self.clean)
    }
}

/// "Minifies" by dropping all whitespace from the bundle.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadMinifier;

impl Minifier for HeadMinifier {
    fn minify(&self, dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        let contents = fs::read_to_string(dir.join(filename))?;
        let output = dir.join(minified_name(filename));
        fs::write(&output, contents.split_whitespace().collect::<String>())?;
        Ok(Some(output))
    }
}
