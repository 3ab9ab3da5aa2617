/// Per-target values substituted into a campaign template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub department: &'a str,
    pub role: &'a str,
}

/// Greeting fallback when a target row imported without a name.
const NAME_FALLBACK: &str = "there";

/// Substitute the per-target placeholders into `text`.
///
/// `{{Name}}` falls back to "there" for targets imported without one, so a
/// rendered greeting never reads "Hi ,". Placeholders the engine doesn't
/// know ("{{Foo}}") are left verbatim. `{{Link}}` is NOT handled here —
/// the dispatcher splices the tracking URL in separately because the link
/// is per-target state, not profile data.
pub fn render(text: &str, vars: &TemplateVars<'_>) -> String {
    let name = if vars.name.is_empty() {
        NAME_FALLBACK
    } else {
        vars.name
    };
    text.replace("{{Name}}", name)
        .replace("{{Email}}", vars.email)
        .replace("{{Department}}", vars.department)
        .replace("{{Role}}", vars.role)
}

/// True when the body carries the `{{Link}}` placeholder.
///
/// Checked at campaign creation: a body with no link slot can never
/// produce a measurable click, so it is rejected up front.
pub fn has_link_placeholder(body: &str) -> bool {
    body.contains("{{Link}}")
}
