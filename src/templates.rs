use once_cell::sync::Lazy;
use tera::{Context, Tera};
use tracing::error;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("pages/index.html", include_str!("../templates/pages/index.html")),
    ("birthday/list.html", include_str!("../templates/birthday/list.html")),
    ("birthday/detail.html", include_str!("../templates/birthday/detail.html")),
    ("birthday/form.html", include_str!("../templates/birthday/form.html")),
    ("birthday/confirm_delete.html", include_str!("../templates/birthday/confirm_delete.html")),
    ("registration/registration_form.html", include_str!("../templates/registration/registration_form.html")),
    ("registration/login.html", include_str!("../templates/registration/login.html")),
    ("registration/logged_out.html", include_str!("../templates/registration/logged_out.html")),
    ("core/403.html", include_str!("../templates/core/403.html")),
    ("core/403csrf.html", include_str!("../templates/core/403csrf.html")),
    ("core/404.html", include_str!("../templates/core/404.html")),
];

static TERA: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    if let Err(e) = tera.add_raw_templates(TEMPLATES.iter().copied()) {
        error!(error = ?e, "failed to compile templates");
    }
    tera
});

pub fn render(name: &str, context: &Context) -> tera::Result<String> {
    TERA.render(name, context)
}
