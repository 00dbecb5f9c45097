//! Field validation and copy-link rendering for wizard pages.

use std::collections::HashMap;

use studio_types::error::WizardError;
use studio_types::wizard::{FieldDescriptor, FormSchema};

/// Check submitted values against a page's form.
///
/// Multi-value fields hold a `,`-joined list; every item is checked on its
/// own. The first failing field is reported.
pub fn validate_values(
    schema: Option<&FormSchema>,
    values: &HashMap<String, String>,
) -> Result<(), WizardError> {
    let Some(schema) = schema else {
        return Ok(());
    };
    for field in &schema.fields {
        validate_field(field, values.get(field.name()).map(String::as_str))?;
    }
    Ok(())
}

fn validate_field(field: &FieldDescriptor, value: Option<&str>) -> Result<(), WizardError> {
    let spec = field.spec();
    let label = if spec.title.is_empty() {
        spec.name.as_str()
    } else {
        spec.title.as_str()
    };
    let invalid = |message: String| WizardError::InvalidField {
        name: spec.name.clone(),
        message,
    };

    let value = value.map(str::trim).unwrap_or_default();
    let items: Vec<&str> = if field.is_multi() {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    } else if value.is_empty() {
        Vec::new()
    } else {
        vec![value]
    };

    if items.is_empty() {
        if spec.required {
            return Err(invalid(format!("{label} is required")));
        }
        return Ok(());
    }

    let is_select = matches!(
        field,
        FieldDescriptor::Select(_) | FieldDescriptor::MultiSelect(_)
    );
    for item in items {
        if is_select
            && !spec.options.is_empty()
            && !spec.options.iter().any(|o| o.value == item)
        {
            return Err(invalid(format!("'{item}' is not a valid choice for {label}")));
        }
        if let Some(rule) = spec.rules.iter().find(|r| !r.matches(item)) {
            let message = if rule.message.is_empty() {
                format!("{label} is invalid")
            } else {
                rule.message.clone()
            };
            return Err(invalid(message));
        }
    }
    Ok(())
}

/// Substitute `{name}` placeholders from the accumulated values.
///
/// Unknown placeholders and unbalanced braces are kept verbatim.
pub fn render_copy_link(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
