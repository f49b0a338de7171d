//! Platform-neutral outbound payload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
}

/// What the core sends back for one event. Presentation layers decide how
/// to render it; `render_text` is the plain-text rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ReplyField>,
    /// Set on failure replies so HTTP callers can tell them apart.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn titled(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            error: true,
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(&format!("**{title}**\n"));
        }
        out.push_str(&self.body);
        for field in &self.fields {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("• {}: {}", field.name, field.value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_title_body_and_fields() {
        let reply = Reply::titled("Push mode", "Updated.")
            .field("Enabled", "yes")
            .field("Level", "strong");
        assert_eq!(
            reply.render_text(),
            "**Push mode**\nUpdated.\n• Enabled: yes\n• Level: strong"
        );
    }

    #[test]
    fn plain_text_has_no_decoration() {
        assert_eq!(Reply::text("hi").render_text(), "hi");
    }

    #[test]
    fn serializes_compactly() {
        let json = serde_json::to_value(Reply::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"body": "hi"}));
        let json = serde_json::to_value(Reply::error("nope")).unwrap();
        assert_eq!(json["error"], true);
    }
}
