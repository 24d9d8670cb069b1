use crate::metadata::{EntityType, Model};
use crate::relational::provider_default_value;
use crate::storage::{MappingInfo, TypeMappingSource};
use crate::{Error, Result, Value};

/// Checks the invariants a model must satisfy before it is frozen.
pub(crate) fn verify(model: &Model, type_mappings: &dyn TypeMappingSource) -> Result<()> {
    Verify {
        model,
        type_mappings,
    }
    .verify()
}

struct Verify<'a> {
    model: &'a Model,
    type_mappings: &'a dyn TypeMappingSource,
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        for et in self.model.entity_types() {
            self.verify_primary_key(et)?;
            self.verify_properties(et)?;
            self.verify_foreign_keys(et)?;

            if et.is_root() {
                self.verify_discriminator_values(et)?;
            }
        }

        Ok(())
    }

    fn verify_primary_key(&self, et: &EntityType) -> Result<()> {
        if !et.is_root() {
            return Ok(());
        }

        let Some(key) = et.primary_key() else {
            if et.is_keyless() {
                return Ok(());
            }
            return Err(Error::invalid_model(format!(
                "entity type `{}` requires a primary key; configure one or mark it keyless",
                et.name()
            )));
        };

        for property in self.model.key(key).properties() {
            let property = self.model.property(*property);
            if property.is_nullable() {
                return Err(Error::invalid_model(format!(
                    "key property `{}.{}` is nullable; key properties must be required",
                    et.name(),
                    property.name()
                )));
            }
        }

        Ok(())
    }

    fn verify_properties(&self, et: &EntityType) -> Result<()> {
        for property in et.declared_properties() {
            let property = self.model.property(*property);

            let info = MappingInfo::for_property(property);
            let mapping = self.type_mappings.find_mapping(property.ty(), &info);

            // An explicit column type or converter stands in for a mapping
            let mapped = mapping.is_some()
                || property.column_type().is_some()
                || property.value_converter().is_some();
            if !mapped {
                return Err(Error::invalid_model(format!(
                    "property `{}.{}` of type {} has no store type mapping",
                    et.name(),
                    property.name(),
                    property.ty()
                )));
            }

            if let Err(err) = provider_default_value(property, mapping.as_ref()) {
                return Err(Error::invalid_model(format!(
                    "default value of `{}.{}` cannot be converted to its stored form: {err}",
                    et.name(),
                    property.name()
                )));
            }
        }

        Ok(())
    }

    fn verify_foreign_keys(&self, et: &EntityType) -> Result<()> {
        for fk in et.declared_foreign_keys() {
            let fk = self.model.foreign_key(*fk);
            let principal_key = self.model.key(fk.principal_key());

            if fk.properties().len() != principal_key.properties().len() {
                return Err(Error::invalid_model(format!(
                    "foreign key {:?} on `{}` has {} properties but the principal key on `{}` has {}",
                    self.model.property_names(fk.properties()),
                    et.name(),
                    fk.properties().len(),
                    self.model.entity_type(fk.principal_entity_type()).name(),
                    principal_key.properties().len(),
                )));
            }

            for (dependent, principal) in fk.properties().iter().zip(principal_key.properties()) {
                let dependent = self.model.property(*dependent);
                let principal = self.model.property(*principal);
                if !dependent.ty().is_key_compatible(principal.ty()) {
                    return Err(Error::invalid_model(format!(
                        "foreign key property `{}.{}` of type {} does not match principal key property `{}` of type {}",
                        et.name(),
                        dependent.name(),
                        dependent.ty(),
                        principal.name(),
                        principal.ty(),
                    )));
                }
            }
        }

        Ok(())
    }

    fn verify_discriminator_values(&self, root: &EntityType) -> Result<()> {
        let mut seen: Vec<(&Value, &str)> = vec![];

        let hierarchy = std::iter::once(root.id()).chain(self.model.derived_types(root.id()));
        for id in hierarchy {
            let et = self.model.entity_type(id);
            if et.is_abstract() {
                continue;
            }
            let Some(value) = et.discriminator_value() else {
                continue;
            };

            if let Some((_, other)) = seen.iter().find(|(seen, _)| *seen == value) {
                return Err(Error::invalid_model(format!(
                    "entity types `{other}` and `{}` share the discriminator value {value}",
                    et.name()
                )));
            }
            seen.push((value, et.name()));
        }

        Ok(())
    }
}
