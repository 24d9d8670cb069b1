use super::mapped_members;
use crate::metadata::EntityTypeId;
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

/// Ignores members marked `NotMapped`.
#[derive(Debug, Default)]
pub struct NotMappedMemberAttributeConvention;

impl Convention for NotMappedMemberAttributeConvention {
    fn name(&self) -> &'static str {
        "NotMappedMemberAttribute"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::EntityTypeAdded]
    }

    fn entity_type_added(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) -> ConventionFlow {
        let not_mapped: Vec<_> = mapped_members(mb.model(), entity_type)
            .into_iter()
            .filter(|member| member.is_not_mapped())
            .map(|member| member.name)
            .collect();

        for name in not_mapped {
            let Some(mut et) = mb.entity_type_builder(entity_type) else {
                break;
            };
            et.ignore(&name, ConfigurationSource::DataAnnotation);
        }

        ConventionFlow::Continue
    }
}
