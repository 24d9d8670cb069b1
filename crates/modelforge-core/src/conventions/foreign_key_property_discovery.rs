use crate::metadata::{
    EntityTypeId, ForeignKey, ForeignKeyId, KeyId, Model, NavigationId, PropertyId,
};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};
use std::collections::HashSet;
use std_util::str::starts_with_ignore_case;

const SOURCE: ConfigurationSource = ConfigurationSource::Convention;

/// Chooses the dependent properties of foreign keys that were not
/// configured explicitly.
///
/// For each principal key property, the dependent property is looked up by
/// name, ignoring case, in this order:
///
/// * `<navigation><KeyProperty>`, using the dependent-to-principal
///   navigation
/// * `<PrincipalEntity><KeyProperty>`
/// * `<KeyProperty>`, when the key property name already starts with the
///   principal's name
///
/// A one-to-one relationship falls back to the dependent's primary key.
/// Without a match, the shadow properties created for the foreign key are
/// renamed after the navigation. Shadow properties left unused are removed.
#[derive(Debug, Default)]
pub struct ForeignKeyPropertyDiscoveryConvention;

impl ForeignKeyPropertyDiscoveryConvention {
    fn discover(&self, mb: &mut ModelBuilder, fk: ForeignKeyId) {
        let model = mb.model();
        let Some(foreign_key) = model.get_foreign_key(fk) else {
            return;
        };
        if !SOURCE.overrides(foreign_key.properties_source()) {
            return;
        }

        match find_properties(model, foreign_key) {
            Some(properties) if properties != foreign_key.properties() => {
                mb.set_foreign_key_properties(fk, Some(properties), None, SOURCE);
            }
            Some(_) => {}
            None => rename_shadow_properties(mb, fk),
        }
    }

    /// Foreign keys declared on `entity_type`, its ancestors and the types
    /// derived from it.
    fn foreign_keys_around(&self, model: &Model, entity_type: EntityTypeId) -> Vec<ForeignKeyId> {
        let mut fks = model.foreign_keys_of(entity_type);
        for derived in model.derived_types(entity_type) {
            fks.extend_from_slice(model.entity_type(derived).declared_foreign_keys());
        }
        fks
    }
}

fn find_properties(model: &Model, fk: &ForeignKey) -> Option<Vec<PropertyId>> {
    let dependent = fk.declaring_entity_type();
    let principal = fk.principal_entity_type();
    let key_properties = model.key(fk.principal_key()).properties();
    let principal_name = model.entity_type(principal).name();

    // Properties already holding another foreign key are not shared.
    let taken: HashSet<PropertyId> = model
        .foreign_keys_of(dependent)
        .into_iter()
        .filter(|other| *other != fk.id())
        .flat_map(|other| model.foreign_key(other).properties().to_vec())
        .collect();

    let available: Vec<PropertyId> = model
        .properties_of(dependent)
        .into_iter()
        .filter(|p| !model.property(*p).is_convention_shadow() && !taken.contains(p))
        .collect();

    let lookup = |name: &str, key_property: PropertyId| -> Option<PropertyId> {
        let key_ty = model.property(key_property).ty();
        let mut matches = available.iter().copied().filter(|p| {
            let p = model.property(*p);
            p.name().eq_ignore_ascii_case(name) && p.ty().is_key_compatible(key_ty)
        });
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    };

    let navigation = fk
        .dependent_to_principal()
        .map(|navigation| model.navigation(navigation).name());
    let prefixes = navigation.into_iter().chain([principal_name]);

    for prefix in prefixes {
        let found: Option<Vec<_>> = key_properties
            .iter()
            .map(|key| lookup(&format!("{prefix}{}", model.property(*key).name()), *key))
            .collect();
        if let Some(found) = found.filter(|found| found != key_properties) {
            return Some(found);
        }
    }

    let bare: Option<Vec<_>> = key_properties
        .iter()
        .map(|key| {
            let name = model.property(*key).name();
            if starts_with_ignore_case(name, principal_name) {
                lookup(name, *key)
            } else {
                None
            }
        })
        .collect();
    if let Some(found) = bare.filter(|found| found != key_properties) {
        return Some(found);
    }

    if fk.is_unique() && !fk.is_self_referencing() {
        let pk = model.key(model.primary_key(dependent)?).properties();
        let compatible = pk.len() == key_properties.len()
            && pk.iter().zip(key_properties).all(|(dependent, principal)| {
                model
                    .property(*dependent)
                    .ty()
                    .is_key_compatible(model.property(*principal).ty())
            });
        if compatible {
            return Some(pk.to_vec());
        }
    }

    None
}

/// Renames convention-created shadow properties after the navigation, or
/// the principal when there is none.
fn rename_shadow_properties(mb: &mut ModelBuilder, fk: ForeignKeyId) {
    let model = mb.model();
    let foreign_key = model.foreign_key(fk);
    let all_shadow = foreign_key
        .properties()
        .iter()
        .all(|p| model.property(*p).is_convention_shadow());
    if !all_shadow {
        return;
    }

    let prefix = match foreign_key.dependent_to_principal() {
        Some(navigation) => model.navigation(navigation).name(),
        None => model.entity_type(foreign_key.principal_entity_type()).name(),
    }
    .to_string();
    let key_properties = model.key(foreign_key.principal_key()).properties().to_vec();

    let aligned = foreign_key
        .properties()
        .iter()
        .zip(&key_properties)
        .all(|(property, key)| {
            let key = model.property(*key).name();
            let expected = if starts_with_ignore_case(key, &prefix) {
                key.to_string()
            } else {
                format!("{prefix}{key}")
            };
            starts_with_ignore_case(model.property(*property).name(), &expected)
        });
    if aligned {
        return;
    }

    let dependent = foreign_key.declaring_entity_type();
    let principal = foreign_key.principal_entity_type();
    let Some(created) =
        mb.create_shadow_foreign_key_properties(dependent, principal, &key_properties, Some(&prefix))
    else {
        return;
    };
    if mb
        .set_foreign_key_properties(fk, Some(created.clone()), None, SOURCE)
        .is_none()
    {
        mb.remove_unused_shadow_properties(&created);
    }
}

impl Convention for ForeignKeyPropertyDiscoveryConvention {
    fn name(&self) -> &'static str {
        "ForeignKeyPropertyDiscovery"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[
            Hook::PropertyAdded,
            Hook::PrimaryKeyChanged,
            Hook::ForeignKeyAdded,
            Hook::NavigationAdded,
        ]
    }

    fn property_added(&self, mb: &mut ModelBuilder, property: PropertyId) -> ConventionFlow {
        let model = mb.model();
        let p = model.property(property);
        if p.is_convention_shadow() {
            return ConventionFlow::Continue;
        }

        for fk in self.foreign_keys_around(model, p.entity_type()) {
            self.discover(mb, fk);
        }
        ConventionFlow::Continue
    }

    /// Foreign keys following the old primary key of the principal move to
    /// the new one. A new key on the dependent may allow the one-to-one
    /// fallback.
    fn primary_key_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _previous: Option<KeyId>,
    ) -> ConventionFlow {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) {
            return ConventionFlow::Continue;
        }

        if let Some(new_key) = model.primary_key(entity_type) {
            let mut hierarchy = model.derived_types(entity_type);
            hierarchy.push(entity_type);

            let referencing: Vec<_> = model
                .foreign_keys()
                .filter(|fk| hierarchy.contains(&fk.principal_entity_type()))
                .filter(|fk| fk.principal_key() != new_key)
                .filter(|fk| SOURCE.overrides(fk.principal_key_source()))
                .map(|fk| fk.id())
                .collect();

            for fk in referencing {
                if mb.set_foreign_key_properties(fk, None, Some(new_key), SOURCE).is_some() {
                    self.discover(mb, fk);
                }
            }
        }

        for fk in self.foreign_keys_around(mb.model(), entity_type) {
            self.discover(mb, fk);
        }
        ConventionFlow::Continue
    }

    fn foreign_key_added(&self, mb: &mut ModelBuilder, foreign_key: ForeignKeyId) -> ConventionFlow {
        self.discover(mb, foreign_key);
        ConventionFlow::Continue
    }

    fn navigation_added(
        &self,
        mb: &mut ModelBuilder,
        navigation: NavigationId,
    ) -> ConventionFlow {
        let fk = mb.model().navigation(navigation).foreign_key();
        self.discover(mb, fk);
        ConventionFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MemberInfo, ScalarType, TypeInfo, TypeRef, TypeRegistry};
    use crate::ConventionSet;

    fn fk_property_names(mb: &ModelBuilder, dependent: &str, navigation: &str) -> Vec<String> {
        let model = mb.model();
        let et = model.find_entity_type(dependent).unwrap().id();
        let nav = model.navigation(model.find_navigation(et, navigation).unwrap());
        model
            .property_names(model.foreign_key(nav.foreign_key()).properties())
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn blog_types(post_members: Vec<MemberInfo>) -> TypeRegistry {
        let mut post = TypeInfo::new("Post")
            .member(MemberInfo::property("Id", ScalarType::I32))
            .member(MemberInfo::property("Blog", TypeRef::entity("Blog")));
        for member in post_members {
            post = post.member(member);
        }
        TypeRegistry::new()
            .with(
                TypeInfo::new("Blog")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Posts", TypeRef::collection(TypeRef::entity("Post")))),
            )
            .with(post)
    }

    #[test]
    fn uses_navigation_named_property() {
        let types = blog_types(vec![MemberInfo::property("BlogId", ScalarType::I32)]);
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Blog", ConfigurationSource::Explicit).unwrap();

        assert_eq!(fk_property_names(&mb, "Post", "Blog"), ["BlogId"]);
        let model = mb.model();
        let post = model.find_entity_type("Post").unwrap().id();
        let blog_id = model.property(model.find_property(post, "BlogId").unwrap());
        assert!(!blog_id.is_shadow());
    }

    #[test]
    fn shadow_property_follows_navigation_name() {
        let types = TypeRegistry::new()
            .with(TypeInfo::new("User").member(MemberInfo::property("Id", ScalarType::I32)))
            .with(
                TypeInfo::new("Post")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Author", TypeRef::entity("User"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Post", ConfigurationSource::Explicit).unwrap();

        assert_eq!(fk_property_names(&mb, "Post", "Author"), ["AuthorId"]);
        let model = mb.model();
        let post = model.find_entity_type("Post").unwrap().id();
        // The principal-named shadow created first is gone.
        assert!(model.find_property(post, "UserId").is_none());
        assert!(model.property(model.find_property(post, "AuthorId").unwrap()).is_shadow());
    }

    #[test]
    fn explicit_properties_are_kept() {
        let types = blog_types(vec![
            MemberInfo::property("BlogId", ScalarType::I32),
            MemberInfo::property("OwnerBlog", ScalarType::I32),
        ]);
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Blog", ConfigurationSource::Explicit).unwrap();

        let model = mb.model();
        let post = model.find_entity_type("Post").unwrap().id();
        let fk = model.navigation(model.find_navigation(post, "Blog").unwrap()).foreign_key();
        mb.foreign_key_builder(fk)
            .unwrap()
            .has_foreign_key(&["OwnerBlog"], ConfigurationSource::Explicit)
            .unwrap();

        // A later property matching by name does not take over.
        mb.entity_type_builder(post)
            .unwrap()
            .property("BlogBlogId", ScalarType::I32, ConfigurationSource::Explicit);
        assert_eq!(fk_property_names(&mb, "Post", "Blog"), ["OwnerBlog"]);
        assert_eq!(
            mb.model().foreign_key(fk).properties_source(),
            Some(ConfigurationSource::Explicit)
        );
    }

    #[test]
    fn one_to_one_uses_dependent_primary_key() {
        let types = TypeRegistry::new()
            .with(
                TypeInfo::new("Order")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Invoice", TypeRef::entity("Invoice"))),
            )
            .with(
                TypeInfo::new("Invoice")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Order", TypeRef::entity("Order"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Invoice", ConfigurationSource::Explicit).unwrap();

        let model = mb.model();
        let invoice = model.find_entity_type("Invoice").unwrap().id();
        let nav = model.navigation(model.find_navigation(invoice, "Order").unwrap());
        let fk = model.foreign_key(nav.foreign_key());
        assert!(fk.is_unique());

        let dependent_pk = model.primary_key(fk.declaring_entity_type()).unwrap();
        assert_eq!(fk.properties(), model.key(dependent_pk).properties());
        // No shadow property was left behind on either side.
        assert!(model.find_property(invoice, "OrderId").is_none());
        let order = model.find_entity_type("Order").unwrap().id();
        assert!(model.find_property(order, "InvoiceId").is_none());
    }
}
