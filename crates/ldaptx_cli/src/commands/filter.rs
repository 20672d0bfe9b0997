//! Filter command implementation.

use ldaptx_codec::{translate, FieldSet, Filter};

/// Parses `text` and returns its wire form. With a non-empty `fields` list
/// the filter must only reference those attributes.
pub fn render(text: &str, fields: &[String]) -> Result<String, Box<dyn std::error::Error>> {
    let filter = Filter::parse(text)?;
    if fields.is_empty() {
        return Ok(filter.to_wire());
    }
    let allowed: FieldSet = fields.iter().map(String::as_str).collect();
    Ok(translate(&filter, &allowed)?)
}

/// Runs the filter command.
pub fn run(text: &str, fields: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(text, fields)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_wire_form() {
        assert_eq!(
            render("(&(uid=tux)(|(uid=tuz)(uid=meow)))", &[]).unwrap(),
            "(&(uid=tux)(|(uid=tuz)(uid=meow)))"
        );
    }

    #[test]
    fn unknown_field_is_refused() {
        let fields = vec!["uid".to_string()];
        assert!(render("(&(uid=tux)(mail=x))", &fields).is_err());
        assert_eq!(render("(uid=tux)", &fields).unwrap(), "(uid=tux)");
    }

    #[test]
    fn malformed_filter_fails() {
        assert!(render("(uid=tux", &[]).is_err());
    }
}
