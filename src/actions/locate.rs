use std::fmt;

use anyhow::Result;

/// The criterion an action primitive uses to locate its target element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// An arbitrary CSS selector expression.
    Css(String),
    /// Visible text content, matched case-insensitively.
    Text(String),
    /// An input/textarea matched by its placeholder attribute.
    Placeholder(String),
    /// An input matched by its type attribute (e.g. `date`).
    InputType(String),
    /// An arbitrary XPath expression.
    Xpath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text(text.into())
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Locator::Placeholder(text.into())
    }

    pub fn input_type(ty: impl Into<String>) -> Self {
        Locator::InputType(ty.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::Xpath(expr.into())
    }

    /// A JS expression evaluating to the first matching element, or null.
    pub fn to_js(&self) -> Result<String> {
        Ok(match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", serde_json::to_string(selector)?)
            }
            Locator::Placeholder(text) => {
                let quoted = serde_json::to_string(text)?;
                let selector =
                    format!("input[placeholder*={quoted} i], textarea[placeholder*={quoted} i]");
                format!("document.querySelector({})", serde_json::to_string(&selector)?)
            }
            Locator::InputType(ty) => {
                let selector = format!("input[type={}]", serde_json::to_string(ty)?);
                format!("document.querySelector({})", serde_json::to_string(&selector)?)
            }
            Locator::Text(text) => format!(
                r#"(() => {{
                    const target = {}.toLowerCase();
                    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT, null);
                    while (walker.nextNode()) {{
                        const node = walker.currentNode;
                        if (node.textContent.trim().toLowerCase().includes(target)) {{
                            return node.parentElement;
                        }}
                    }}
                    return null;
                }})()"#,
                serde_json::to_string(text)?
            ),
            Locator::Xpath(expr) => format!(
                r#"document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"#,
                serde_json::to_string(expr)?
            ),
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css {s:?}"),
            Locator::Text(s) => write!(f, "text {s:?}"),
            Locator::Placeholder(s) => write!(f, "placeholder {s:?}"),
            Locator::InputType(s) => write!(f, "input type {s:?}"),
            Locator::Xpath(s) => write!(f, "xpath {s:?}"),
        }
    }
}
