//! Entity definitions: field names, required-ness, identity, and the
//! path-segment registry used to resolve a definition at request time.

/// One declared (non-id) field of an entity. All declared fields are strings.
#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub required: bool,
}

/// Single source of truth for one entity: consumed by request validation,
/// filter translation, and response shaping.
#[derive(Clone, Copy, Debug)]
pub struct EntityDef {
    /// Model name used in error messages (e.g. "Bio").
    pub name: &'static str,
    /// MongoDB collection name.
    pub collection: &'static str,
    /// URL path segment the entity is served under (e.g. "bios").
    pub path_segment: &'static str,
    /// Identity field name on the API surface. Stored as `_id`.
    pub id_field: &'static str,
    pub fields: &'static [FieldDef],
}

impl EntityDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }
}

pub const BIO: EntityDef = EntityDef {
    name: "Bio",
    collection: "Bio",
    path_segment: "bios",
    id_field: "id",
    fields: &[
        FieldDef { name: "firstName", required: true },
        FieldDef { name: "lastName", required: true },
        FieldDef { name: "email", required: true },
        FieldDef { name: "linkedInUrl", required: true },
        FieldDef { name: "curriculumVitae", required: true },
    ],
};

pub const EXPERIENCE: EntityDef = EntityDef {
    name: "Experience",
    collection: "Experience",
    path_segment: "experiences",
    id_field: "id",
    fields: &[
        FieldDef { name: "organization", required: true },
        FieldDef { name: "role", required: true },
        FieldDef { name: "duration", required: true },
    ],
};

/// All entities served by this backend.
pub const ENTITIES: &[EntityDef] = &[BIO, EXPERIENCE];

/// Lookup table from path segment to entity definition.
#[derive(Clone, Copy, Debug)]
pub struct Registry {
    entities: &'static [EntityDef],
}

impl Registry {
    pub const fn new(entities: &'static [EntityDef]) -> Self {
        Registry { entities }
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&'static EntityDef> {
        self.entities.iter().find(|e| e.path_segment == path)
    }

    pub fn entities(&self) -> &'static [EntityDef] {
        self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_segments() {
        let registry = Registry::new(ENTITIES);
        assert_eq!(registry.entity_by_path("bios").unwrap().name, "Bio");
        assert_eq!(
            registry.entity_by_path("experiences").unwrap().name,
            "Experience"
        );
        assert!(registry.entity_by_path("widgets").is_none());
    }

    #[test]
    fn bio_fields_are_all_required() {
        assert_eq!(BIO.required_fields().count(), BIO.fields.len());
        assert!(BIO.field("email").is_some());
        assert!(BIO.field("id").is_none());
    }
}
