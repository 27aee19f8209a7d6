//! Meeting/proposal fixture shared by the integration tests.

#![allow(dead_code)]

use treegraft_core::{Catalog, FieldDef, Identity, Record, RelationDef, Storage, TypeDef, Value};

pub const ORG: Identity = Identity(1);
pub const ANN: Identity = Identity(1);
pub const URGENT: Identity = Identity(1);
pub const BOARD: Identity = Identity(1);
pub const AGM: Identity = Identity(2);
pub const BUDGET: Identity = Identity(1);
pub const HIRING: Identity = Identity(2);
pub const BYLAWS: Identity = Identity(4);

pub fn catalog() -> Catalog {
    Catalog::new()
        .with_type(TypeDef::new("User").with_field(FieldDef::new("name")))
        .with_type(TypeDef::new("Organisation").with_field(FieldDef::new("name")))
        .with_type(TypeDef::new("Meeting").with_field(FieldDef::new("name")))
        .with_type(TypeDef::new("Tag").with_field(FieldDef::new("label")))
        .with_type(TypeDef::new("Proposal").with_field(FieldDef::new("title")))
        .with_type(
            TypeDef::new("DiffProposal")
                .extends("Proposal")
                .with_field(FieldDef::new("diff")),
        )
        .with_relation(RelationDef::one("Meeting", "organisation", "Organisation").required())
        .with_relation(RelationDef::one("Meeting", "chair", "User"))
        .with_relation(RelationDef::one("Proposal", "meeting", "Meeting").required())
        .with_relation(RelationDef::one("Proposal", "author", "User"))
        .with_relation(RelationDef::one("Proposal", "supersedes", "Proposal"))
        .with_relation(RelationDef::many("Proposal", "tags", "Tag"))
}

/// Two meetings of one organisation:
///
/// - Board: Budget (tagged urgent, supersedes Hiring) and Hiring;
/// - AGM: Bylaws, a diff proposal.
pub fn seed(storage: &mut dyn Storage) {
    let records = [
        Record::new("Organisation", ORG).with_field("name", "Acme"),
        Record::new("User", ANN).with_field("name", "ann"),
        Record::new("Tag", URGENT).with_field("label", "urgent"),
        Record::new("Meeting", BOARD)
            .with_field("name", "Board")
            .with_field("organisation", ORG)
            .with_field("chair", ANN),
        Record::new("Meeting", AGM)
            .with_field("name", "AGM")
            .with_field("organisation", ORG)
            .with_field("chair", Value::Null),
        Record::new("Proposal", BUDGET)
            .with_field("title", "Budget")
            .with_field("meeting", BOARD)
            .with_field("author", ANN)
            .with_field("supersedes", HIRING)
            .with_field("tags", vec![URGENT]),
        Record::new("Proposal", HIRING)
            .with_field("title", "Hiring")
            .with_field("meeting", BOARD)
            .with_field("author", ANN)
            .with_field("supersedes", Value::Null)
            .with_field("tags", Vec::<Identity>::new()),
        Record::new("DiffProposal", BYLAWS)
            .with_field("diff", "+art. 3")
            .with_parent(
                Record::new("Proposal", BYLAWS)
                    .with_field("title", "Bylaws")
                    .with_field("meeting", AGM)
                    .with_field("author", ANN),
            ),
    ];

    for record in &records {
        storage.insert(record).unwrap();
    }
}

/// Follow a reference field.
pub fn reference(record: &Record, field: &str) -> Option<Identity> {
    record.get(field).and_then(Value::as_ref_identity)
}
