//! Tests for rips-model types.

use serde_json::Value;

use rips_model::{
    Consultation, Medication, Procedure, RipsDocument, SchemaNode, SchemaPath, Services,
    Transaction, User, rips_schema,
};

fn populated_transaction() -> Transaction {
    Transaction {
        users: vec![User {
            consecutive: 1,
            services: Services {
                consultations: vec![Consultation::default()],
                procedures: vec![Procedure::default()],
                medications: vec![Medication::default()],
                ..Services::default()
            },
            ..User::default()
        }],
        ..Transaction::default()
    }
}

/// Walk `value` along `path`, stepping into the first element of arrays.
fn lookup<'a>(value: &'a Value, path: &SchemaPath) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        if let Value::Array(items) = current {
            current = items.first()?;
        }
        current = current.get(segment)?;
    }
    Some(current)
}

#[test]
fn typed_document_covers_every_schema_leaf() {
    let schema = rips_schema();
    let document = RipsDocument::from_transaction(&populated_transaction()).unwrap();

    for path in schema.leaf_paths() {
        assert!(
            lookup(document.root(), &path).is_some(),
            "typed document is missing {path}"
        );
    }
}

#[test]
fn typed_document_key_order_matches_schema() {
    let schema = rips_schema();
    let document = RipsDocument::from_transaction(&populated_transaction()).unwrap();

    let user_path = SchemaPath::parse("transaccion.usuarios").unwrap();
    let SchemaNode::Array(fields) = schema.find(&user_path).unwrap() else {
        panic!("usuarios must be an array");
    };
    let expected: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    let user = &document.users().unwrap()[0];
    let actual: Vec<&str> = user.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(actual, expected);
}

#[test]
fn document_serializes_transparently() {
    let document = RipsDocument::from_transaction(&Transaction::default()).unwrap();
    let json = document.to_json_pretty().unwrap();
    let parsed: RipsDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, document);
    assert!(json.starts_with("{\n  \"transaccion\""));
}
