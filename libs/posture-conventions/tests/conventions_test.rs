#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end convention runs over catalogs built in code and from the
//! sample API manifest.

use std::path::PathBuf;

use posture_conventions::{
    Acknowledgement, ActionDescriptor, ActionScope, AnnotationKind, ControllerCatalog,
    ControllerDescriptor, ControllerId, ConventionChecks, ConventionsConfig, FindingKind, HttpVerb,
    Ledger, Posture, Rule, load_manifests, resolve_action, resolve_controller,
};

fn id(name: &str) -> ControllerId {
    ControllerId::new(name).unwrap()
}

fn sample_api() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_api.yaml")
}

fn names<'a>(subjects: impl Iterator<Item = &'a posture_conventions::Subject>) -> Vec<String> {
    subjects.map(ToString::to_string).collect()
}

#[test]
fn controller_without_posture_fails_until_annotated() {
    let ledger = Ledger::default();
    let config = ConventionsConfig::default();

    let bare = ControllerDescriptor::named("Api.Reports").unwrap();
    let catalog = ControllerCatalog::new([bare.clone()]).unwrap();
    let outcome = ConventionChecks::new(&catalog, &ledger, &config)
        .run(Rule::ExplicitControllerPosture);
    assert!(!outcome.passed());
    assert_eq!(outcome.findings[0].subject.to_string(), "Api.Reports");
    assert_eq!(outcome.findings[0].kind, FindingKind::MissingPosture);
    assert!(outcome.diagnostic().contains("Api.Reports"));

    let catalog =
        ControllerCatalog::new([bare.with_annotation(AnnotationKind::Authorize)]).unwrap();
    let outcome = ConventionChecks::new(&catalog, &ledger, &config)
        .run(Rule::ExplicitControllerPosture);
    assert!(outcome.passed());
}

#[test]
fn controller_declaring_both_postures_fails() {
    let controller = ControllerDescriptor::named("Api.Confused")
        .unwrap()
        .with_annotation(AnnotationKind::AllowAnonymous)
        .with_annotation(AnnotationKind::Authorize);
    let catalog = ControllerCatalog::new([controller]).unwrap();
    let ledger = Ledger::default();
    let config = ConventionsConfig::default();

    assert_eq!(
        resolve_controller(&catalog, "Api.Confused"),
        Some(Posture::Anonymous)
    );
    let outcome = ConventionChecks::new(&catalog, &ledger, &config)
        .run(Rule::ExplicitControllerPosture);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].kind, FindingKind::ConflictingPosture);
}

fn authorized_controller(anonymous_get: bool) -> ControllerDescriptor {
    let mut get_anonymous = ActionDescriptor::new("GetAnonymous")
        .unwrap()
        .with_http_verb(HttpVerb::Get);
    if anonymous_get {
        get_anonymous = get_anonymous.with_annotation(AnnotationKind::AllowAnonymous);
    }
    ControllerDescriptor::named("Api.A")
        .unwrap()
        .with_annotation(AnnotationKind::Authorize)
        .with_action(
            ActionDescriptor::new("Get")
                .unwrap()
                .with_http_verb(HttpVerb::Get),
        )
        .with_action(get_anonymous)
}

#[test]
fn anonymous_action_needs_acknowledgement_and_goes_stale_when_removed() {
    let config = ConventionsConfig::default();
    let catalog = ControllerCatalog::new([authorized_controller(true)]).unwrap();

    assert_eq!(
        resolve_action(&catalog, "Api.A", "Get"),
        Some(Posture::Authorized)
    );
    assert_eq!(
        resolve_action(&catalog, "Api.A", "GetAnonymous"),
        Some(Posture::Anonymous)
    );

    let empty = Ledger::default();
    let outcome =
        ConventionChecks::new(&catalog, &empty, &config).run(Rule::AnonymousActionsAcknowledged);
    assert_eq!(names(outcome.unacknowledged()), vec!["Api.A.GetAnonymous"]);
    assert!(
        outcome.findings[0]
            .remediation
            .contains("kind: anonymous_method, controller: Api.A, method: GetAnonymous")
    );

    let ledger = Ledger::new([Acknowledgement::anonymous_method(
        id("Api.A"),
        "GetAnonymous",
        "public health check",
    )
    .unwrap()])
    .unwrap();
    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::AnonymousActionsAcknowledged);
    assert!(outcome.passed());

    let catalog = ControllerCatalog::new([authorized_controller(false)]).unwrap();
    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::AnonymousActionsAcknowledged);
    assert_eq!(outcome.unacknowledged().count(), 0);
    assert_eq!(names(outcome.stale()), vec!["Api.A.GetAnonymous"]);
    assert!(outcome.findings[0].remediation.starts_with("remove from ledger"));
}

fn anonymous_controller(authorized_get: bool) -> ControllerDescriptor {
    let mut get_authorized = ActionDescriptor::new("GetAuthorized")
        .unwrap()
        .with_http_verb(HttpVerb::Get);
    if authorized_get {
        get_authorized = get_authorized.with_annotation(AnnotationKind::Authorize);
    }
    ControllerDescriptor::named("Api.Public")
        .unwrap()
        .with_annotation(AnnotationKind::AllowAnonymous)
        .with_action(
            ActionDescriptor::new("Get")
                .unwrap()
                .with_http_verb(HttpVerb::Get),
        )
        .with_action(get_authorized)
}

#[test]
fn authorized_action_in_anonymous_controller_needs_acknowledgement() {
    let config = ConventionsConfig::default();
    let catalog = ControllerCatalog::new([anonymous_controller(true)]).unwrap();

    assert_eq!(
        resolve_action(&catalog, "Api.Public", "Get"),
        Some(Posture::Anonymous)
    );
    assert_eq!(
        resolve_action(&catalog, "Api.Public", "GetAuthorized"),
        Some(Posture::Authorized)
    );

    let empty = Ledger::default();
    let outcome =
        ConventionChecks::new(&catalog, &empty, &config).run(Rule::AuthorizedActionsAcknowledged);
    assert!(!outcome.passed());
    assert_eq!(
        names(outcome.unacknowledged()),
        vec!["Api.Public.GetAuthorized"]
    );
    assert!(outcome.findings[0].remediation.contains(
        "kind: authorized_method, controller: Api.Public, method: GetAuthorized"
    ));

    let ledger = Ledger::new([Acknowledgement::authorized_method(
        id("Api.Public"),
        "GetAuthorized",
        "admin export",
    )
    .unwrap()])
    .unwrap();
    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::AuthorizedActionsAcknowledged);
    assert!(outcome.passed());

    let catalog = ControllerCatalog::new([anonymous_controller(false)]).unwrap();
    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::AuthorizedActionsAcknowledged);
    assert_eq!(outcome.unacknowledged().count(), 0);
    assert_eq!(names(outcome.stale()), vec!["Api.Public.GetAuthorized"]);
    assert!(outcome.findings[0].remediation.starts_with("remove from ledger"));
}

#[test]
fn action_declaring_both_postures_fails() {
    let controller = ControllerDescriptor::named("Api.X")
        .unwrap()
        .with_annotation(AnnotationKind::Authorize)
        .with_action(
            ActionDescriptor::new("Get")
                .unwrap()
                .with_http_verb(HttpVerb::Get)
                .with_annotation(AnnotationKind::AllowAnonymous)
                .with_annotation(AnnotationKind::Authorize),
        )
        .with_action(
            ActionDescriptor::new("List")
                .unwrap()
                .with_http_verb(HttpVerb::Get)
                .with_annotation(AnnotationKind::AllowAnonymous),
        );
    let catalog = ControllerCatalog::new([controller]).unwrap();
    let ledger = Ledger::default();
    let config = ConventionsConfig::default();

    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::ActionPostureConflict);
    assert!(!outcome.passed());
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].subject.to_string(), "Api.X.Get");
    assert_eq!(outcome.findings[0].kind, FindingKind::ConflictingPosture);

    let clean = ControllerDescriptor::named("Api.X")
        .unwrap()
        .with_annotation(AnnotationKind::Authorize)
        .with_action(
            ActionDescriptor::new("Get")
                .unwrap()
                .with_http_verb(HttpVerb::Get)
                .with_annotation(AnnotationKind::Authorize),
        );
    let catalog = ControllerCatalog::new([clean]).unwrap();
    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::ActionPostureConflict);
    assert!(outcome.passed());
}

#[test]
fn derived_anonymous_controller_overrides_authorized_base() {
    let base = ControllerDescriptor::named("Api.SecureBase")
        .unwrap()
        .mark_abstract();
    let middle = ControllerDescriptor::named("Api.Authorized")
        .unwrap()
        .mark_abstract()
        .with_base(id("Api.SecureBase"));
    let public = ControllerDescriptor::named("Api.Public")
        .unwrap()
        .with_base(id("Api.Authorized"))
        .with_annotation(AnnotationKind::AllowAnonymous);
    let catalog = ControllerCatalog::new([base, middle, public]).unwrap();
    let ledger = Ledger::default();
    let config = ConventionsConfig::default();

    let checks = ConventionChecks::new(&catalog, &ledger, &config);
    assert_eq!(
        checks.snapshot().controller("Api.Public").unwrap().posture(),
        Posture::Anonymous
    );
    let outcome = checks.run(Rule::AnonymousControllersAcknowledged);
    assert_eq!(names(outcome.unacknowledged()), vec!["Api.Public"]);
    assert!(checks.run(Rule::BaseControllersAbstract).passed());
}

#[test]
fn non_abstract_base_is_reported() {
    let base = ControllerDescriptor::named("Api.Base")
        .unwrap()
        .with_annotation(AnnotationKind::Authorize);
    let derived = ControllerDescriptor::named("Api.Derived")
        .unwrap()
        .with_base(id("Api.Base"));
    let catalog = ControllerCatalog::new([base, derived]).unwrap();
    let ledger = Ledger::default();
    let config = ConventionsConfig::default();

    let outcome =
        ConventionChecks::new(&catalog, &ledger, &config).run(Rule::BaseControllersAbstract);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].subject.to_string(), "Api.Base");
    assert_eq!(outcome.findings[0].kind, FindingKind::NonAbstractBase);
}

fn abstract_with_action(action: ActionDescriptor) -> ControllerCatalog {
    let base = ControllerDescriptor::named("Api.Base")
        .unwrap()
        .mark_abstract()
        .with_action(action);
    let derived = ControllerDescriptor::named("Api.Derived")
        .unwrap()
        .with_base(id("Api.Base"))
        .with_annotation(AnnotationKind::Authorize);
    ControllerCatalog::new([base, derived]).unwrap()
}

#[test]
fn abstract_controller_must_not_add_public_actions() {
    let ledger = Ledger::default();
    let config = ConventionsConfig::default();
    let test_get = ActionDescriptor::new("TestGet")
        .unwrap()
        .with_http_verb(HttpVerb::Get);

    let catalog = abstract_with_action(test_get.clone());
    let outcome = ConventionChecks::new(&catalog, &ledger, &config)
        .run(Rule::AbstractControllersAddNoActions);
    assert_eq!(names(outcome.findings.iter().map(|f| &f.subject)), vec![
        "Api.Base.TestGet"
    ]);

    let catalog = abstract_with_action(test_get.clone().overriding());
    assert!(
        ConventionChecks::new(&catalog, &ledger, &config)
            .run(Rule::AbstractControllersAddNoActions)
            .passed()
    );

    let catalog = abstract_with_action(
        test_get.with_visibility(posture_conventions::Visibility::Protected),
    );
    assert!(
        ConventionChecks::new(&catalog, &ledger, &config)
            .run(Rule::AbstractControllersAddNoActions)
            .passed()
    );
}

#[test]
fn sample_api_only_fails_the_abstract_posture_rule() {
    let module = load_manifests(&[sample_api()]).unwrap();
    assert_eq!(module.catalog.len(), 4);
    assert_eq!(module.ledger.len(), 3);

    let report = module.check(&ConventionsConfig::default());
    assert_eq!(report.outcomes.len(), Rule::ALL.len());
    assert_eq!(
        report.failed_rules(),
        vec![Rule::AbstractControllersDeclareNoPosture]
    );

    let outcome = report
        .outcome(Rule::AbstractControllersDeclareNoPosture)
        .unwrap();
    assert_eq!(
        outcome.findings[0].subject.to_string(),
        "SecurityConventionsApi.Controllers.ItsHierarchicalBaseController"
    );
}

#[test]
fn sample_api_all_public_scope_includes_unrouted_methods() {
    let module = load_manifests(&[sample_api()]).unwrap();
    let config = ConventionsConfig {
        action_scope: ActionScope::AllPublic,
        disabled_rules: vec![Rule::AbstractControllersDeclareNoPosture],
    };

    let report = module.check(&config);
    assert_eq!(report.failed_rules(), vec![Rule::AnonymousActionsAcknowledged]);
    let outcome = report.outcome(Rule::AnonymousActionsAcknowledged).unwrap();
    assert_eq!(
        names(outcome.unacknowledged()),
        vec![
            "SecurityConventionsApi.Controllers.ItsAuthorizedController.GetAnonymousWithNoHttpMethod"
        ]
    );
}

#[test]
fn report_serializes_rule_codes_and_findings() {
    let module = load_manifests(&[sample_api()]).unwrap();
    let report = module.check(&ConventionsConfig::default());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["controllers_scanned"], 4);
    let failed: Vec<_> = json["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|o| o["passed"] == false)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["rule"], "SC50");
    assert_eq!(failed[0]["findings"][0]["kind"], "abstract_declares_posture");
    assert_eq!(failed[0]["findings"][0]["subject"]["type"], "controller");
}
