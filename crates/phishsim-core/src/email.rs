/// Syntactic email check for import rows.
///
/// Deliberately loose — one `@`, a non-empty local part, a dotted domain
/// that doesn't start with a dot. Deliverability is the SMTP relay's
/// problem; this only filters rows that can never be an address.
pub fn is_valid_email(raw: &str) -> bool {
    let trimmed = raw.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
