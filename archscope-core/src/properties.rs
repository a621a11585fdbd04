//! Property files (`*.prp`) describing the programs stored in a project.
//!
//! A property file is a small XML document of `STATE` elements:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <FILE_INFO>
//!     <BASIC_INFO>
//!         <STATE NAME="CONTENT_TYPE" TYPE="string" VALUE="Program" />
//!         <STATE NAME="NAME" TYPE="string" VALUE="ls" />
//!     </BASIC_INFO>
//! </FILE_INFO>
//! ```
//!
//! Only the `NAME`/`VALUE` pairs are read back, so property files written by
//! the headless analyzer into its own project folders list the same way.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const PROPERTY_EXTENSION: &str = "prp";

pub const KEY_NAME: &str = "NAME";
pub const KEY_FORMAT: &str = "FORMAT";
pub const KEY_PATH: &str = "PATH";
pub const KEY_LANGUAGE: &str = "LANGUAGE";
pub const KEY_SOURCE: &str = "SOURCE";

/// `SOURCE` value marking entries written by the project store itself rather
/// than by the headless analyzer.
pub const SOURCE_STORE: &str = "archscope";

fn state_regex() -> &'static Regex {
    static STATE: OnceLock<Regex> = OnceLock::new();
    STATE.get_or_init(|| {
        Regex::new(r#"<STATE\s+NAME="([^"]*)"(?:\s+TYPE="[^"]*")?\s+VALUE="([^"]*)"\s*/>"#)
            .expect("STATE pattern is valid")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Collects every `STATE` entry in `text`. Later duplicates win.
    pub fn parse(text: &str) -> Self {
        let entries = state_regex()
            .captures_iter(text)
            .map(|cap| (unescape(&cap[1]), unescape(&cap[2])))
            .collect();
        Self { entries }
    }

    /// True when this entry was recorded by the project store.
    pub fn is_store_entry(&self) -> bool {
        self.get(KEY_SOURCE) == Some(SOURCE_STORE)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<FILE_INFO>\n    <BASIC_INFO>\n");
        xml.push_str("        <STATE NAME=\"CONTENT_TYPE\" TYPE=\"string\" VALUE=\"Program\" />\n");
        for (key, value) in &self.entries {
            if key == "CONTENT_TYPE" {
                continue;
            }
            xml.push_str(&format!(
                "        <STATE NAME=\"{}\" TYPE=\"string\" VALUE=\"{}\" />\n",
                escape(key),
                escape(value)
            ));
        }
        xml.push_str("    </BASIC_INFO>\n</FILE_INFO>\n");
        xml
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> String {
    // &amp; last so "&amp;lt;" decodes to "&lt;"
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
