use modelforge_core::metadata::PropertyId;
use modelforge_core::reflect::{ScalarType, TypeRegistry};
use modelforge_core::{
    Annotation, AnnotationTarget, ConfigurationSource, Convention, ConventionFlow, ConventionSet,
    Hook, ModelBuilder, Value,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std_util::{assert_err, assert_none, assert_some};

const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;
const CONVENTION: ConfigurationSource = ConfigurationSource::Convention;

type Log = Arc<Mutex<Vec<String>>>;

/// Records every property it sees and answers with a fixed flow.
struct RecordProperty {
    name: &'static str,
    log: Log,
    flow: ConventionFlow,
}

impl Convention for RecordProperty {
    fn name(&self) -> &'static str {
        self.name
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::PropertyAdded]
    }

    fn property_added(&self, mb: &mut ModelBuilder, property: PropertyId) -> ConventionFlow {
        let property = mb.model().property(property).name().to_string();
        self.log.lock().unwrap().push(format!("{}:{property}", self.name));
        self.flow
    }
}

fn recorder(name: &'static str, log: &Log, flow: ConventionFlow) -> RecordProperty {
    RecordProperty {
        name,
        log: log.clone(),
        flow,
    }
}

fn builder(conventions: ConventionSet) -> ModelBuilder {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    ModelBuilder::new(TypeRegistry::new(), conventions)
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn conventions_run_in_registration_order() {
    let log = Log::default();
    let mut conventions = ConventionSet::empty();
    conventions
        .add(recorder("first", &log, ConventionFlow::Continue))
        .add(recorder("second", &log, ConventionFlow::Continue));

    let mut mb = builder(conventions);
    mb.entity("Tag", EXPLICIT)
        .unwrap()
        .property("Label", ScalarType::String, EXPLICIT)
        .unwrap();

    assert_eq!(entries(&log), ["first:Label", "second:Label"]);
}

#[test]
fn stop_skips_remaining_conventions() {
    let log = Log::default();
    let mut conventions = ConventionSet::empty();
    conventions
        .add(recorder("first", &log, ConventionFlow::Stop))
        .add(recorder("second", &log, ConventionFlow::Continue));

    let mut mb = builder(conventions);
    let mut tag = mb.entity("Tag", EXPLICIT).unwrap();
    assert_some!(tag.property("Label", ScalarType::String, EXPLICIT));
    let tag = tag.id();

    assert_eq!(entries(&log), ["first:Label"]);
    assert_some!(mb.model().find_property(tag, "Label"));
}

#[test]
fn stop_and_revert_undoes_the_mutation() {
    let log = Log::default();
    let mut conventions = ConventionSet::empty();
    conventions
        .add(recorder("veto", &log, ConventionFlow::StopAndRevert))
        .add(recorder("after", &log, ConventionFlow::Continue));

    let mut mb = builder(conventions);
    let mut tag = mb.entity("Tag", EXPLICIT).unwrap();
    assert_none!(tag.property("Label", ScalarType::String, EXPLICIT));
    let tag = tag.id();

    assert_eq!(entries(&log), ["veto:Label"]);
    assert_none!(mb.model().find_property(tag, "Label"));
}

#[test]
fn repeated_configuration_fires_once() {
    let log = Log::default();
    let mut conventions = ConventionSet::empty();
    conventions.add(recorder("record", &log, ConventionFlow::Continue));

    let mut mb = builder(conventions);
    for _ in 0..2 {
        mb.entity("Tag", EXPLICIT)
            .unwrap()
            .property("Label", ScalarType::String, EXPLICIT)
            .unwrap();
    }

    assert_eq!(entries(&log), ["record:Label"]);
}

/// Copies the `source` model annotation to `copy` whenever it changes.
struct CopyAnnotation;

impl Convention for CopyAnnotation {
    fn name(&self) -> &'static str {
        "CopyAnnotation"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::AnnotationChanged]
    }

    fn annotation_changed(
        &self,
        mb: &mut ModelBuilder,
        target: AnnotationTarget,
        name: &str,
        new: Option<&Annotation>,
        _old: Option<&Annotation>,
    ) -> ConventionFlow {
        if target != AnnotationTarget::Model || name != "source" {
            return ConventionFlow::Continue;
        }
        match new {
            Some(annotation) => mb.set_annotation("copy", annotation.value.clone(), CONVENTION),
            None => mb.remove_annotation("copy", CONVENTION),
        };
        ConventionFlow::Continue
    }
}

/// Rejects setting the `source` model annotation to `"forbidden"`.
struct RejectForbidden;

impl Convention for RejectForbidden {
    fn name(&self) -> &'static str {
        "RejectForbidden"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::AnnotationChanged]
    }

    fn annotation_changed(
        &self,
        _mb: &mut ModelBuilder,
        _target: AnnotationTarget,
        name: &str,
        new: Option<&Annotation>,
        _old: Option<&Annotation>,
    ) -> ConventionFlow {
        if name != "source" {
            return ConventionFlow::Continue;
        }
        match new.and_then(|annotation| annotation.value.as_str()) {
            Some("forbidden") => ConventionFlow::StopAndRevert,
            _ => ConventionFlow::Continue,
        }
    }
}

#[test]
fn annotation_changes_cascade() {
    let mut conventions = ConventionSet::empty();
    conventions.add(CopyAnnotation);
    let mut mb = builder(conventions);

    mb.set_annotation("source", "blue", EXPLICIT).unwrap();
    assert_eq!(mb.model().annotations().value("copy"), Some(&Value::from("blue")));

    mb.remove_annotation("source", EXPLICIT).unwrap();
    assert_none!(mb.model().annotations().value("copy"));
}

#[test]
fn reverted_annotation_keeps_earlier_convention_changes() {
    let mut conventions = ConventionSet::empty();
    conventions.add(CopyAnnotation).add(RejectForbidden);
    let mut mb = builder(conventions);

    mb.set_annotation("source", "blue", EXPLICIT).unwrap();
    assert_none!(mb.set_annotation("source", "forbidden", EXPLICIT));

    let annotations = mb.model().annotations();
    let source = annotations.get("source").unwrap();
    assert_eq!(source.value, Value::from("blue"));
    assert_eq!(source.source, EXPLICIT);

    // The copy was made before the veto and stays
    assert_eq!(annotations.value("copy"), Some(&Value::from("forbidden")));
}

/// Bumps the `counter` model annotation every time it changes.
struct Runaway;

impl Convention for Runaway {
    fn name(&self) -> &'static str {
        "Runaway"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::AnnotationChanged]
    }

    fn annotation_changed(
        &self,
        mb: &mut ModelBuilder,
        _target: AnnotationTarget,
        name: &str,
        new: Option<&Annotation>,
        _old: Option<&Annotation>,
    ) -> ConventionFlow {
        if name != "counter" {
            return ConventionFlow::Continue;
        }
        let next = new.and_then(|annotation| annotation.value.as_i64()).unwrap_or(0) + 1;
        mb.set_annotation("counter", next, CONVENTION);
        ConventionFlow::Continue
    }
}

#[test]
fn runaway_conventions_fail_finalization() {
    let mut conventions = ConventionSet::empty();
    conventions.add(Runaway);
    let mut mb = builder(conventions);

    mb.set_annotation("counter", 0i64, CONVENTION).unwrap();

    let err = assert_err!(mb.finalize());
    assert!(err.is_convention_depth_exceeded());
}

#[test]
fn lower_sources_cannot_override() {
    let mut mb = builder(ConventionSet::empty());
    let mut tag = mb.entity("Tag", EXPLICIT).unwrap();
    let mut label = tag.property("Label", ScalarType::String, EXPLICIT).unwrap();

    label.has_max_length(40u32, ConfigurationSource::DataAnnotation).unwrap();
    assert_none!(label.has_max_length(10u32, CONVENTION));
    assert!(!label.can_set_max_length(CONVENTION));
    assert!(label.can_set_max_length(EXPLICIT));

    label.has_max_length(80u32, EXPLICIT).unwrap();
    assert_none!(label.has_max_length(20u32, ConfigurationSource::DataAnnotation));
    assert_eq!(label.metadata().max_length(), Some(80));
}
