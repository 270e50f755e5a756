//! HTML page rendering

use std::sync::Arc;

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::error::Result;

const LOGIN_TEMPLATE: &str = include_str!("../templates/login.hbs");
const UPLOAD_TEMPLATE: &str = include_str!("../templates/upload.hbs");

/// A one-shot message shown above a form
#[derive(Debug, Clone, Serialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Error,
    Success,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
        }
    }
}

/// Compiled page templates
#[derive(Clone)]
pub struct Templates {
    registry: Arc<Handlebars<'static>>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string("login", LOGIN_TEMPLATE)?;
        registry.register_template_string("upload", UPLOAD_TEMPLATE)?;

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    pub fn login(&self, flashes: &[Flash]) -> Result<String> {
        Ok(self
            .registry
            .render("login", &json!({ "flashes": flashes }))?)
    }

    pub fn upload(&self, user: &str, flashes: &[Flash]) -> Result<String> {
        Ok(self
            .registry
            .render("upload", &json!({ "user": user, "flashes": flashes }))?)
    }
}
