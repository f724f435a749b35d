//! Classification of JSON member names.

/// Control information the reader acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Type,
    Id,
    Removed,
    Context,
    Bind,
    Delta,
    /// Recognised but irrelevant for decoding (`etag`, `editLink`, ...).
    Other,
}

impl Control {
    fn from_name(name: &str) -> Self {
        match name {
            "type" => Control::Type,
            "id" => Control::Id,
            "removed" => Control::Removed,
            "context" => Control::Context,
            "bind" => Control::Bind,
            "delta" => Control::Delta,
            _ => Control::Other,
        }
    }
}

/// What a member of a JSON object is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Member {
    /// A property value.
    Property,
    /// `@odata.type`, `@id`, ...
    Control(Control),
    /// `@ns.term`, with the term.
    Instance(String),
    /// `Prop@odata.type`, `Prop@odata.bind`, ...
    PropertyControl(String, Control),
    /// `Prop@ns.term`
    PropertyInstance,
}

enum Term<'a> {
    Control(Control),
    Instance(&'a str),
}

/// `odata.type` and the 4.01 short form `type` are the same control term;
/// anything else with a namespace is an instance annotation term.
fn term(raw: &str) -> Term<'_> {
    if let Some(control) = raw.strip_prefix("odata.") {
        return Term::Control(Control::from_name(control));
    }
    if raw.contains('.') {
        return Term::Instance(raw);
    }
    Term::Control(Control::from_name(raw))
}

pub(crate) fn classify(key: &str) -> Member {
    match key.split_once('@') {
        None => Member::Property,
        Some(("", raw)) => match term(raw) {
            Term::Control(control) => Member::Control(control),
            Term::Instance(term) => Member::Instance(term.to_string()),
        },
        Some((property, raw)) => match term(raw) {
            Term::Control(control) => Member::PropertyControl(property.to_string(), control),
            Term::Instance(_) => Member::PropertyInstance,
        },
    }
}

/// Qualify a type name as it appears in `@odata.type`.
///
/// The leading `#` is dropped and bare primitive names (`#Int64`) gain the
/// `Edm.` namespace, also inside `Collection(...)`.
pub(crate) fn type_name(raw: &str) -> String {
    let name = raw.strip_prefix('#').unwrap_or(raw);
    if let Some(element) = name
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return format!("Collection({})", qualify(element));
    }
    qualify(name)
}

fn qualify(name: &str) -> String {
    if !name.contains('.') && odata_edm::EdmPrimitiveKind::from_name(name).is_some() {
        format!("Edm.{name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_classified_by_their_annotation_part() {
        assert_eq!(classify("Name"), Member::Property);
        assert_eq!(classify("@odata.type"), Member::Control(Control::Type));
        assert_eq!(classify("@id"), Member::Control(Control::Id));
        assert_eq!(classify("@odata.etag"), Member::Control(Control::Other));
        assert_eq!(
            classify("@Core.Messages"),
            Member::Instance("Core.Messages".to_string())
        );
        assert_eq!(
            classify("Orders@odata.bind"),
            Member::PropertyControl("Orders".to_string(), Control::Bind)
        );
        assert_eq!(
            classify("Orders@delta"),
            Member::PropertyControl("Orders".to_string(), Control::Delta)
        );
        assert_eq!(classify("Name@Core.Description"), Member::PropertyInstance);
    }

    #[test]
    fn type_names_are_qualified() {
        assert_eq!(type_name("#Int64"), "Edm.Int64");
        assert_eq!(type_name("#Edm.Int64"), "Edm.Int64");
        assert_eq!(type_name("#Sales.VipCustomer"), "Sales.VipCustomer");
        assert_eq!(type_name("#Collection(String)"), "Collection(Edm.String)");
        assert_eq!(type_name("Sales.Color"), "Sales.Color");
    }
}
