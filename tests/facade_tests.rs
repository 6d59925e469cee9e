//! End-to-end console flows against a mock backend: fetch, join, table,
//! export, review and onboarding, all through the `ElimuQa` facade.

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elimu_qa::prelude::*;

fn record_json(facility_id: Uuid, school: &str, status: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "institution_id": Uuid::new_v4(),
        "school_name": school,
        "facility_id": facility_id,
        "facility_type": "classroom",
        "assessment_date": "2024-03-14",
        "urgent_items": 0,
        "attention_items": 1,
        "good_items": 7,
        "total_items": 8,
        "overall_condition": "good",
        "status": status,
        "school_feedback": null,
        "agent_feedback": null,
        "score_percent": 91.0,
        "details": [],
        "created_at": "2024-03-14T10:00:00Z",
        "updated_at": "2024-03-14T10:00:00Z"
    })
}

/// A list screen mounts, fetches assessments and facilities, joins them
/// by id, narrows by status, and exports what is visible.
#[tokio::test]
async fn list_screen_fetch_join_filter_export() {
    let mock_server = MockServer::start().await;
    let classroom_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/facilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": classroom_id,
            "institution_id": null,
            "name": "Classroom Block A",
            "description": null,
            "color": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assessments/maintenance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            record_json(classroom_id, "Kibera Primary", "approved"),
            record_json(Uuid::new_v4(), "Moi Girls", "pending-county"),
            record_json(classroom_id, "Nakuru High", "pending-county"),
        ])))
        .mount(&mock_server)
        .await;

    let client = ElimuQa::new(&mock_server.uri(), "fake-key");

    let names = client.facilities().name_index().await.expect("name_index");
    let mut records = client
        .assessments(AssessmentKind::Maintenance)
        .list(&ListFilters::new())
        .await
        .expect("list");
    with_facility_names(&mut records, &names);

    let columns = vec![
        Column::new("school", "School", |r: &AssessmentRecord| {
            r.school_name.clone()
        }),
        Column::new("facility", "Facility", |r: &AssessmentRecord| {
            r.facility_name.clone().unwrap_or_default()
        }),
        Column::new("status", "Status", |r: &AssessmentRecord| {
            r.status.badge_label().to_string()
        }),
    ];
    let mut view = TableView::new(columns, records);
    view.set_filter("status", |r: &AssessmentRecord| {
        r.status == ReviewStatus::PendingCounty
    });
    view.sort_by("school", SortOrder::Ascending).expect("sort");

    let snapshot = view.snapshot();
    assert_eq!(snapshot.rows.len(), 2);
    // The unjoined facility shows the placeholder, never a blank cell.
    assert_eq!(snapshot.rows[0][0], "Moi Girls");
    assert_eq!(snapshot.rows[0][1], "—");
    assert_eq!(snapshot.rows[1][1], "Classroom Block A");

    let csv = to_csv(&snapshot);
    assert!(csv.starts_with("School,Facility,Status\n"));
    assert!(csv.contains("Nakuru High"));
    assert_eq!(file_name("maintenance", ExportFormat::Csv), "maintenance.csv");
}

/// A county reviewer approves: the PATCH goes out and the record comes
/// back advanced to the national queue, matching the local transition.
#[tokio::test]
async fn review_flow_advances_to_national_queue() {
    let mock_server = MockServer::start().await;
    let assessment_id = Uuid::new_v4();

    let mut updated = record_json(Uuid::new_v4(), "Kibera Primary", "pending-national");
    updated["id"] = json!(assessment_id);
    Mock::given(method("PATCH"))
        .and(path(format!("/api/v1/assessments/{}/review", assessment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .mount(&mock_server)
        .await;

    let client = ElimuQa::new(&mock_server.uri(), "fake-key");
    let form = ReviewForm::new()
        .decision(ReviewDecision::Approve)
        .remarks("Verified on site")
        .recommended_action("Forward for disbursement")
        .priority(Priority::Medium);

    let record = client
        .review()
        .submit(assessment_id, &form)
        .await
        .expect("submit")
        .expect("updated record");

    let expected = transition(
        ReviewStatus::PendingCounty,
        ReviewerTier::County,
        ReviewDecision::Approve,
    )
    .expect("transition");
    assert_eq!(record.status, expected);
    assert_eq!(surface_for_role("county_admin"), ReviewSurface::AssessmentReview);
    assert_eq!(surface_for_role("school_admin"), ReviewSurface::AssessmentList);
}

/// An agent files a classroom assessment through the intake form.
#[tokio::test]
async fn intake_form_submits_through_the_facade() {
    let mock_server = MockServer::start().await;
    let facility_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v1/assessments/safety"))
        .respond_with(ResponseTemplate::new(201)
            .set_body_json(record_json(facility_id, "Kibera Primary", "pending-county")))
        .mount(&mock_server)
        .await;

    let client = ElimuQa::new(&mock_server.uri(), "fake-key");
    let mut form = AssessmentForm::new(
        FacilityType::Classroom,
        facility_id,
        Uuid::new_v4(),
        chrono::NaiveDate::from_ymd_opt(2024, 3, 14).expect("valid date"),
    );
    form.rate("Lighting", Condition::Attention).expect("rate");
    form.attach("photo.jpg", vec![1, 2, 3]);

    let created = form
        .submit(&client.assessments(AssessmentKind::Safety))
        .await
        .expect("submit");
    assert_eq!(
        created.expect("created record").status,
        ReviewStatus::PendingCounty
    );
}

/// Custom client options move every collection under the new prefix.
#[tokio::test]
async fn custom_api_prefix_is_respected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/facilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let options = ClientOptions::default().with_api_prefix("/api/v2");
    let client = ElimuQa::new_with_options(&mock_server.uri(), "fake-key", options);
    let facilities = client.facilities().list().await.expect("list");
    assert!(facilities.is_empty());
}

/// Onboarding: the dependent sub-county select resets on county change,
/// and registration posts through the facade.
#[tokio::test]
async fn onboarding_flow_registers_a_school() {
    let mock_server = MockServer::start().await;
    let county_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/counties/{}/subcounties", county_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "county_id": county_id, "name": "Njoro" }
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/institutions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": Uuid::new_v4(),
            "name": "Nakuru High",
            "county": "Nakuru",
            "sub_county": "Njoro",
            "contact_email": null,
            "contact_phone": null,
            "created_at": "2024-01-10T08:00:00Z",
            "updated_at": "2024-01-10T08:00:00Z"
        })))
        .mount(&mock_server)
        .await;

    let client = ElimuQa::new(&mock_server.uri(), "fake-key");
    let subcounties = client
        .onboarding()
        .subcounties(county_id)
        .await
        .expect("subcounties");
    assert_eq!(subcounties[0].name, "Njoro");

    let mut form = elimu_qa::admin::OnboardingForm::new("Nakuru High");
    form.set_county("Kiambu");
    form.set_sub_county("Ruiru");
    form.set_county("Nakuru");
    assert!(form.sub_county.is_empty());
    form.set_sub_county("Njoro");

    let institution = client.onboarding().register(&form).await.expect("register");
    assert_eq!(institution.name, "Nakuru High");
}
