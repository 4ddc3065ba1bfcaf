//! Server-rendered pages.
//!
//! Templates are compiled into the binary and rendered with tera. Every
//! template name ends in `.html`, so interpolated values are autoescaped.

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::Result;
use crate::service::dashboard::Dashboard;

const TEMPLATES: [(&str, &str); 4] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
];

/// Values echoed back into the form after a failed attempt.
#[derive(Debug, Default, Serialize)]
pub struct RegisterValues<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    pub fn login(&self, error: Option<&str>, notice: Option<&str>, email: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("error", &error);
        context.insert("notice", &notice);
        context.insert("email", email);
        Ok(self.tera.render("login.html", &context)?)
    }

    pub fn register(&self, error: Option<&str>, values: &RegisterValues<'_>) -> Result<String> {
        let mut context = Context::from_serialize(values)?;
        context.insert("error", &error);
        Ok(self.tera.render("register.html", &context)?)
    }

    pub fn dashboard(&self, dashboard: &Dashboard) -> Result<String> {
        let context = Context::from_serialize(dashboard)?;
        Ok(self.tera.render("dashboard.html", &context)?)
    }
}
