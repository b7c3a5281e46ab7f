use meshtree_common::Center;
use thiserror::Error;

/// Non-fatal problems found while indexing a document.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StructuralWarning {
    #[error("unnamed attribute on '{owner}' skipped")]
    UnnamedAttribute { owner: String },

    #[error("attribute '{attribute}' has unrecognized association '{center}' for a {owner_kind}")]
    UnrecognizedAssociation {
        attribute: String,
        center: Center,
        owner_kind: &'static str,
    },

    #[error("unknown item kind '{kind}' for '{name}' in the hierarchy")]
    UnknownItemKind { name: String, kind: String },
}
