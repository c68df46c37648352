/// What the symbol table needs from the external field-metadata registry
/// (§1 lists it as an out-of-scope collaborator: "the field-metadata
/// registry that maps field identifiers to bit positions"). `add_field`
/// consults this to learn a field's width and whether it is maskable
/// (which decides Ordinal vs Nominal); bit position and the rest of the
/// descriptor are the registry's business, not the symbol table's.
pub trait FieldRegistry {
    fn describe(&self, field_id: &str) -> Option<FieldDescriptor>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub width: u16,
    pub maskable: bool,
}

/// A registry with no fields, useful for exercising symbol-table
/// registration logic that never reaches `add_field`.
pub struct EmptyRegistry;

impl FieldRegistry for EmptyRegistry {
    fn describe(&self, _field_id: &str) -> Option<FieldDescriptor> {
        None
    }
}
