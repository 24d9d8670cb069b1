use crate::metadata::{ForeignKeyId, Model};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

const SOURCE: ConfigurationSource = ConfigurationSource::Convention;

/// Indexes the dependent properties of every foreign key once the model is
/// complete.
///
/// A key or index starting with the foreign key's properties already
/// serves lookups and makes the index redundant. For a unique foreign key
/// only a key or unique index over exactly those properties does.
#[derive(Debug, Default)]
pub struct ForeignKeyIndexConvention;

fn is_covered(model: &Model, fk: ForeignKeyId) -> bool {
    let fk = model.foreign_key(fk);
    let dependent = fk.declaring_entity_type();
    let properties = fk.properties();

    let by_key = model.keys_of(dependent).into_iter().any(|key| {
        let key = model.key(key).properties();
        if fk.is_unique() {
            key == properties
        } else {
            key.starts_with(properties)
        }
    });

    let by_index = model.indexes_of(dependent).into_iter().any(|index| {
        let index = model.index(index);
        if fk.is_unique() {
            index.is_unique() && index.properties() == properties
        } else {
            index.properties().starts_with(properties)
        }
    });

    by_key || by_index
}

impl Convention for ForeignKeyIndexConvention {
    fn name(&self) -> &'static str {
        "ForeignKeyIndex"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::ModelFinalizing]
    }

    fn model_finalizing(&self, mb: &mut ModelBuilder) -> ConventionFlow {
        let model = mb.model();
        let uncovered: Vec<_> = model
            .foreign_keys()
            .map(|fk| fk.id())
            .filter(|fk| !is_covered(model, *fk))
            .map(|fk| {
                let fk = model.foreign_key(fk);
                (fk.declaring_entity_type(), fk.properties().to_vec(), fk.is_unique())
            })
            .collect();

        for (dependent, properties, unique) in uncovered {
            let Some(index) = mb.add_index(dependent, properties, SOURCE) else {
                continue;
            };
            if unique {
                if let Some(mut index) = mb.index_builder(index) {
                    index.is_unique(true, SOURCE);
                }
            }
        }

        ConventionFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MemberInfo, ScalarType, TypeInfo, TypeRef, TypeRegistry};
    use crate::ConventionSet;

    fn index_names(mb: &ModelBuilder, entity: &str) -> Vec<(Vec<String>, bool)> {
        let model = mb.model();
        let et = model.find_entity_type(entity).unwrap().id();
        model
            .indexes_of(et)
            .into_iter()
            .map(|index| {
                let index = model.index(index);
                let names = model.property_names(index.properties());
                (names.into_iter().map(str::to_string).collect(), index.is_unique())
            })
            .collect()
    }

    #[test]
    fn indexes_uncovered_foreign_keys() {
        let types = TypeRegistry::new()
            .with(
                TypeInfo::new("Blog")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Posts", TypeRef::collection(TypeRef::entity("Post")))),
            )
            .with(
                TypeInfo::new("Post")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("BlogId", ScalarType::I32)),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Blog", ConfigurationSource::Explicit).unwrap();
        ForeignKeyIndexConvention.model_finalizing(&mut mb);

        assert_eq!(index_names(&mb, "Post"), [(vec!["BlogId".to_string()], false)]);
        assert!(index_names(&mb, "Blog").is_empty());
    }

    #[test]
    fn key_prefix_covers_foreign_key() {
        let types = TypeRegistry::new()
            .with(TypeInfo::new("Order").member(MemberInfo::property("Id", ScalarType::I32)))
            .with(
                TypeInfo::new("OrderLine")
                    .member(MemberInfo::property("OrderId", ScalarType::I32))
                    .member(MemberInfo::property("LineNo", ScalarType::I32))
                    .member(MemberInfo::property("Order", TypeRef::entity("Order"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("OrderLine", ConfigurationSource::Explicit)
            .unwrap()
            .primary_key(&["OrderId", "LineNo"], ConfigurationSource::Explicit)
            .unwrap();
        ForeignKeyIndexConvention.model_finalizing(&mut mb);

        assert!(index_names(&mb, "OrderLine").is_empty());
    }

    #[test]
    fn unique_foreign_key_gets_unique_index() {
        let types = TypeRegistry::new()
            .with(
                TypeInfo::new("Person")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Passport", TypeRef::entity("Passport"))),
            )
            .with(
                TypeInfo::new("Passport")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("HolderId", ScalarType::I32))
                    .member(MemberInfo::property("Holder", TypeRef::entity("Person"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Person", ConfigurationSource::Explicit).unwrap();
        ForeignKeyIndexConvention.model_finalizing(&mut mb);

        assert_eq!(index_names(&mb, "Passport"), [(vec!["HolderId".to_string()], true)]);
    }
}
