use crate::ScaffoldOptions;
use modelforge_core::metadata::{EntityTypeId, Model};
use std_util::str::{pluralize, singularize, starts_with_ignore_case, uniquify, upper_camel};

/// Derives model names from database names.
pub(crate) struct Namer<'a> {
    options: &'a ScaffoldOptions,
}

impl<'a> Namer<'a> {
    pub(crate) fn new(options: &'a ScaffoldOptions) -> Namer<'a> {
        Namer { options }
    }

    /// Converts a table or column name to an identifier.
    fn identifier(&self, name: &str) -> String {
        if self.options.use_database_names {
            return name.to_string();
        }

        match upper_camel(name) {
            converted if converted.is_empty() => name.to_string(),
            converted => converted,
        }
    }

    pub(crate) fn entity_type_name(&self, model: &Model, table: &str) -> String {
        let mut base = self.identifier(table);
        if self.options.singularize_entity_names && !self.options.use_database_names {
            base = singularize(&base);
        }
        uniquify(&base, |candidate| {
            model.find_entity_type(candidate).is_some()
        })
    }

    /// Property names may not repeat the entity type name or any other
    /// member of the entity type.
    pub(crate) fn property_name(&self, model: &Model, entity_type: EntityTypeId, column: &str) -> String {
        let base = self.identifier(column);
        uniquify(&base, |candidate| is_member_name_taken(model, entity_type, candidate))
    }

    /// Names the reference to the principal after the foreign key column
    /// with its `Id` suffix removed, or after the principal.
    pub(crate) fn dependent_to_principal_name(
        &self,
        model: &Model,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        fk_property_names: &[&str],
    ) -> String {
        let base = match fk_property_names {
            [single] if single.len() > 2 && ends_with_id(single) => {
                single[..single.len() - 2].trim_end_matches('_').to_string()
            }
            _ => model.entity_type(principal).name().to_string(),
        };
        let base = if base.is_empty() {
            model.entity_type(principal).name().to_string()
        } else {
            base
        };
        uniquify(&base, |candidate| is_member_name_taken(model, dependent, candidate))
    }

    /// Names the navigation from the principal to its dependents.
    pub(crate) fn principal_to_dependent_name(
        &self,
        model: &Model,
        principal: EntityTypeId,
        dependent: EntityTypeId,
        is_unique: bool,
    ) -> String {
        let dependent_name = model.entity_type(dependent).name();
        let base = if !is_unique && self.options.pluralize_navigations {
            pluralize(dependent_name)
        } else {
            dependent_name.to_string()
        };
        uniquify(&base, |candidate| is_member_name_taken(model, principal, candidate))
    }
}

/// `AuthorId`, `AuthorID` and `author_id` end with an id; `Valid` does not.
fn ends_with_id(name: &str) -> bool {
    let Some(stem) = name.len().checked_sub(2).filter(|at| name.is_char_boundary(*at)) else {
        return false;
    };
    match &name[stem..] {
        "Id" | "ID" => true,
        suffix => starts_with_ignore_case(suffix, "id") && name[..stem].ends_with('_'),
    }
}

fn is_member_name_taken(model: &Model, entity_type: EntityTypeId, name: &str) -> bool {
    model.entity_type(entity_type).name() == name
        || model.find_property(entity_type, name).is_some()
        || model.find_navigation(entity_type, name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_core::reflect::TypeRegistry;
    use modelforge_core::{ConventionSet, ModelBuilder};

    #[test]
    fn identifiers() {
        let options = ScaffoldOptions::default();
        let namer = Namer::new(&options);
        assert_eq!(namer.identifier("order_items"), "OrderItems");
        assert_eq!(namer.identifier("Blog"), "Blog");

        let mut options = ScaffoldOptions::default();
        options.use_database_names(true);
        let namer = Namer::new(&options);
        assert_eq!(namer.identifier("order_items"), "order_items");
    }

    #[test]
    fn singular_entity_names() {
        let mb = ModelBuilder::new(TypeRegistry::new(), ConventionSet::empty());
        let model = mb.model();
        let mut options = ScaffoldOptions::default();
        assert_eq!(Namer::new(&options).entity_type_name(model, "blog_posts"), "BlogPosts");

        options.singularize_entity_names(true);
        assert_eq!(Namer::new(&options).entity_type_name(model, "blog_posts"), "BlogPost");
    }

    #[test]
    fn id_suffix() {
        assert!(ends_with_id("AuthorId"));
        assert!(ends_with_id("author_id"));
        assert!(ends_with_id("AuthorID"));
        assert!(!ends_with_id("Valid"));
        assert!(!ends_with_id("d"));
    }
}
