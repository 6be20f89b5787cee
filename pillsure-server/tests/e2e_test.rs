//! End-to-end integration test
//!
//! Boots the real router on a random port and drives the API with reqwest:
//! registration/login, the onboarding merge-and-gate flow for all three
//! roles, appointment slot conflicts, the admin medicine image diff, and
//! the public storefront endpoints.

use chrono::Utc;
use pillsure_core::model::Medicine;
use pillsure_server::media::{LocalMediaStore, MediaStore};
use pillsure_server::rag::RagClient;
use pillsure_server::{AppState, build_router, config::ServerConfig};
use pillsure_store::Db;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

const MEDIA_BASE_URL: &str = "http://pillsure.test/media";

/// Start a test server on a random port, returns (base_url, state, _temp_dir)
async fn start_test_server() -> (String, Arc<AppState>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let media_dir = temp_dir.path().join("media");
    std::fs::create_dir_all(&media_dir).unwrap();

    let mut config = ServerConfig::default();
    config.storage.data_dir = temp_dir.path().to_path_buf();
    config.media.dir = media_dir.clone();
    config.media.base_url = MEDIA_BASE_URL.to_string();
    config.auth.jwt_secret = "e2e-test-secret-0123456789".to_string();
    // Nothing listens here; upstream failures must surface as 502.
    config.rag.api_url = "http://127.0.0.1:9".to_string();

    let db = Db::open(temp_dir.path().join("pillsure.sqlite")).unwrap();
    let media = Arc::new(LocalMediaStore::new(media_dir, MEDIA_BASE_URL));
    let rag = RagClient::new(config.rag.api_url.clone());

    let state = Arc::new(AppState {
        db,
        config,
        media,
        rag,
    });

    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state, temp_dir)
}

async fn register(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    role: &str,
) -> (String, Value) {
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "email": email,
            "password": "hunter22",
            "firstName": "Test",
            "lastName": "User",
            "role": role,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "register should return 201");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (token, body["data"]["user"].clone())
}

#[tokio::test]
async fn test_health_check() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pillsure-server");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let (token, user) = register(&client, &base_url, "pat@example.com", "patient").await;
    assert_eq!(user["role"], "patient");
    assert_eq!(user["onboardingStep"], 0);
    assert!(user.get("passwordHash").is_none());

    // Wrong password is rejected.
    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({"email": "pat@example.com", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Correct password returns a fresh token.
    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({"email": "pat@example.com", "password": "hunter22"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Duplicate registration conflicts.
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "email": "pat@example.com",
            "password": "x",
            "firstName": "A",
            "lastName": "B",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Profile requires a token...
    let resp = client
        .get(format!("{}/api/auth/profile", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // ...which may also arrive as a query parameter.
    let resp = client
        .get(format!("{}/api/auth/profile?token={}", base_url, token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "pat@example.com");
}

#[tokio::test]
async fn test_patient_onboarding_merge_and_gate() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, _user) = register(&client, &base_url, "pat@example.com", "patient").await;

    // Step 1 only, no bloodGroup: saved but incomplete.
    let resp = client
        .post(format!("{}/api/onboarding/patient", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "gender": "male",
            "mobile": "3001234567",
            "dateOfBirth": "1990-01-01",
            "address": "X",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 1);
    assert_eq!(body["data"]["isOnboardingComplete"], false);

    let resp = client
        .get(format!("{}/api/onboarding/status", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 1);

    // Follow-up with only the gating field: merge completes the record.
    let resp = client
        .post(format!("{}/api/onboarding/patient", base_url))
        .bearer_auth(&token)
        .json(&json!({"bloodGroup": "O+"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 3);
    assert_eq!(body["data"]["isOnboardingComplete"], true);

    // Earlier fields survived the partial save.
    let resp = client
        .get(format!("{}/api/onboarding/patient", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["mobile"], "3001234567");
    assert_eq!(body["data"]["address"], "X");
    assert_eq!(body["data"]["bloodGroup"], "O+");

    // Re-saving step 1 alone keeps the record complete.
    let resp = client
        .post(format!("{}/api/onboarding/patient", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "gender": "male",
            "mobile": "3001234567",
            "dateOfBirth": "1990-01-01",
            "address": "Y",
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 3);
    assert_eq!(body["data"]["isOnboardingComplete"], true);
}

#[tokio::test]
async fn test_doctor_onboarding_validation_and_gate() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, _user) = register(&client, &base_url, "doc@example.com", "doctor").await;

    // Missing mobile: 422 naming the field.
    let resp = client
        .post(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(&token)
        .json(&json!({"gender": "female", "address": "Clinic Rd 12"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("mobile"));

    // Step 1 alone: incomplete.
    let resp = client
        .post(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "gender": "female",
            "mobile": "3217654321",
            "address": "Clinic Rd 12",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 1);
    assert_eq!(body["data"]["isOnboardingComplete"], false);

    // Step 2 gating fields: complete.
    let resp = client
        .post(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "specializations": [1, 2],
            "qualifications": ["MBBS", "FCPS"],
            "experienceYears": 9,
            "feePkr": 2500,
            "consultationModes": ["online", "physical"],
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 3);
    assert_eq!(body["data"]["isOnboardingComplete"], true);

    // Re-saving step 1 does not regress completion.
    let resp = client
        .post(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "gender": "female",
            "mobile": "3217654321",
            "address": "Clinic Rd 12",
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 3);
    assert_eq!(body["data"]["isOnboardingComplete"], true);

    let resp = client
        .get(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["feePkr"], "2500.00");
    assert_eq!(body["data"]["qualifications"][0], "MBBS");
}

#[tokio::test]
async fn test_hospital_onboarding_and_email_conflict() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (token_a, _) = register(&client, &base_url, "hosp-a@example.com", "hospital").await;
    let (token_b, _) = register(&client, &base_url, "hosp-b@example.com", "hospital").await;

    let step_one = json!({
        "hospitalName": "City Care",
        "hospitalAddress": "Main Blvd",
        "hospitalContactNo": "042-111-222",
        "hospitalEmail": "front@citycare.example",
    });

    let resp = client
        .post(format!("{}/api/onboarding/hospital", base_url))
        .bearer_auth(&token_a)
        .json(&step_one)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isOnboardingComplete"], false);

    // Finishing the gating fields completes the record.
    let resp = client
        .post(format!("{}/api/onboarding/hospital", base_url))
        .bearer_auth(&token_a)
        .json(&json!({"licenseNo": "LHR-991", "adminName": "S. Khan"}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 3);

    // Another user claiming the same hospital email conflicts.
    let resp = client
        .post(format!("{}/api/onboarding/hospital", base_url))
        .bearer_auth(&token_b)
        .json(&step_one)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Re-saving one's own row is idempotent, not a conflict.
    let resp = client
        .post(format!("{}/api/onboarding/hospital", base_url))
        .bearer_auth(&token_a)
        .json(&step_one)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

/// Complete a doctor's onboarding and return the doctor profile id.
async fn onboard_doctor(client: &reqwest::Client, base_url: &str, token: &str) -> String {
    let resp = client
        .post(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(token)
        .json(&json!({
            "gender": "male",
            "mobile": "3210000000",
            "address": "Clinic Rd",
            "specializations": [1],
            "qualifications": ["MBBS"],
            "experienceYears": 5,
            "feePkr": 1500,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_appointment_slot_conflict() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (patient_token, _) = register(&client, &base_url, "pat@example.com", "patient").await;
    let (doctor_token, _) = register(&client, &base_url, "doc@example.com", "doctor").await;
    let doctor_id = onboard_doctor(&client, &base_url, &doctor_token).await;

    let booking = json!({
        "doctorId": doctor_id,
        "appointmentDate": "2026-09-01",
        "appointmentTime": "10:30 AM",
        "consultationMode": "online",
        "patientNotes": "recurring headaches",
    });

    let resp = client
        .post(format!("{}/api/appointments", base_url))
        .bearer_auth(&patient_token)
        .json(&booking)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();

    // Same slot again: rejected with 400 while the first is pending.
    let resp = client
        .post(format!("{}/api/appointments", base_url))
        .bearer_auth(&patient_token)
        .json(&booking)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("already booked"));

    // The slot shows up in the public booked-slots listing.
    let resp = client
        .get(format!(
            "{}/api/appointments/booked-slots/{}/2026-09-01",
            base_url, doctor_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0], "10:30 AM");

    // Unknown doctor: 404.
    let resp = client
        .post(format!("{}/api/appointments", base_url))
        .bearer_auth(&patient_token)
        .json(&json!({
            "doctorId": "nope",
            "appointmentDate": "2026-09-01",
            "appointmentTime": "10:30 AM",
            "consultationMode": "online",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // The doctor sees the booking and can attach notes.
    let resp = client
        .get(format!("{}/api/appointments/doctor", base_url))
        .bearer_auth(&doctor_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["id"], appointment_id.as_str());
    assert_eq!(body["data"][0]["patientEmail"], "pat@example.com");

    let resp = client
        .put(format!(
            "{}/api/appointments/{}/notes",
            base_url, appointment_id
        ))
        .bearer_auth(&doctor_token)
        .json(&json!({"diagnosis": "tension headache"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["diagnosis"], "tension headache");

    // Cancelling frees the slot for a new booking.
    let resp = client
        .put(format!(
            "{}/api/appointments/{}/status",
            base_url, appointment_id
        ))
        .bearer_auth(&patient_token)
        .json(&json!({"status": "cancelled", "reason": "conflict"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/api/appointments", base_url))
        .bearer_auth(&patient_token)
        .json(&booking)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
}

fn seed_medicine(db: &Db, name: &str, category: Option<&str>, stock: i64) -> i64 {
    db.insert_medicine(&Medicine {
        id: 0,
        medicine_name: name.to_string(),
        medicine_url: None,
        price: Some("25.00".to_string()),
        discount: None,
        stock: Some(stock),
        images: Vec::new(),
        prescription_required: false,
        drug_category: category.map(String::from),
        drug_varient: None,
        description: None,
        created_at: Utc::now(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_storefront_medicines() {
    let (base_url, state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    seed_medicine(&state.db, "Panadol Extra", Some("Analgesic"), 50);
    seed_medicine(&state.db, "Brufen", Some("NSAID"), 10);
    seed_medicine(&state.db, "Expired Stock", Some("NSAID"), 0);

    // Public, no token required.
    let resp = client
        .get(format!("{}/api/medicines/featured", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["medicineName"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Panadol Extra"));
    assert!(names.contains(&"Brufen"));
    assert!(!names.contains(&"Expired Stock"));

    let resp = client
        .get(format!("{}/api/medicines/search?q=panadol", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["medicines"][0]["medicineName"], "Panadol Extra");

    let resp = client
        .get(format!("{}/api/medicines/99999", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_admin_requires_role() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (patient_token, _) = register(&client, &base_url, "pat@example.com", "patient").await;
    let (admin_token, _) = register(&client, &base_url, "admin@example.com", "admin").await;

    let resp = client
        .get(format!("{}/api/admin/stats", base_url))
        .bearer_auth(&patient_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(format!("{}/api/admin/stats", base_url))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["users"]["total"], 2);
    assert_eq!(body["data"]["users"]["byRole"]["patient"], 1);

    // Paging bounds are enforced.
    let resp = client
        .get(format!("{}/api/admin/medicines?limit=500", base_url))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_admin_medicine_image_diff() {
    let (base_url, state, dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (admin_token, _) = register(&client, &base_url, "admin@example.com", "admin").await;

    // Stored images [A, B, C], physically present in the media store.
    let id = seed_medicine(&state.db, "Panadol", Some("Analgesic"), 10);
    let a = state.media.put("medicines", "a.png", "image/png", b"img-a").unwrap();
    let b = state.media.put("medicines", "b.png", "image/png", b"img-b").unwrap();
    let c = state.media.put("medicines", "c.png", "image/png", b"img-c").unwrap();
    state
        .db
        .set_medicine_images(id, &[a.url.clone(), b.url.clone(), c.url.clone()])
        .unwrap();

    // Keep [A, B], upload one new file.
    let form = reqwest::multipart::Form::new()
        .text(
            "existingImages",
            serde_json::to_string(&[&a.url, &b.url]).unwrap(),
        )
        .part(
            "images",
            reqwest::multipart::Part::bytes(b"img-new".to_vec())
                .file_name("new.png")
                .mime_str("image/png")
                .unwrap(),
        );

    let resp = client
        .put(format!("{}/api/admin/medicines/{}", base_url, id))
        .bearer_auth(&admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let images: Vec<String> = body["data"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(images.len(), 3);
    assert_eq!(images[0], a.url);
    assert_eq!(images[1], b.url);
    assert!(images[2].starts_with(MEDIA_BASE_URL));

    // C was orphaned and deleted from storage; A/B and the new file remain.
    let media_root = dir.path().join("media");
    assert!(!media_root.join(&c.key).exists());
    assert!(media_root.join(&a.key).exists());
    let new_key = state.media.key_for_url(&images[2]).unwrap();
    assert!(media_root.join(&new_key).exists());

    // Keeping 3 and uploading 2 would exceed the 4-image cap.
    let form = reqwest::multipart::Form::new()
        .text("existingImages", serde_json::to_string(&images).unwrap())
        .part(
            "images",
            reqwest::multipart::Part::bytes(b"x".to_vec())
                .file_name("x.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .part(
            "images",
            reqwest::multipart::Part::bytes(b"y".to_vec())
                .file_name("y.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let resp = client
        .put(format!("{}/api/admin/medicines/{}", base_url, id))
        .bearer_auth(&admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // JSON body on the same endpoint performs a metadata update.
    let resp = client
        .put(format!("{}/api/admin/medicines/{}", base_url, id))
        .bearer_auth(&admin_token)
        .json(&json!({"stock": 77}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["stock"], 77);
    assert_eq!(body["data"]["medicineName"], "Panadol");
}

#[tokio::test]
async fn test_reviews_flow() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (patient_token, _) = register(&client, &base_url, "pat@example.com", "patient").await;
    let (doctor_token, _) = register(&client, &base_url, "doc@example.com", "doctor").await;
    let doctor_id = onboard_doctor(&client, &base_url, &doctor_token).await;

    // Out-of-range rating.
    let resp = client
        .post(format!("{}/api/reviews", base_url))
        .bearer_auth(&patient_token)
        .json(&json!({"doctorId": doctor_id, "rating": 6}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/reviews", base_url))
        .bearer_auth(&patient_token)
        .json(&json!({"doctorId": doctor_id, "rating": 4, "comment": "Thorough"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Second review by the same user conflicts.
    let resp = client
        .post(format!("{}/api/reviews", base_url))
        .bearer_auth(&patient_token)
        .json(&json!({"doctorId": doctor_id, "rating": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Public listing with the average.
    let resp = client
        .get(format!("{}/api/reviews/doctor/{}", base_url, doctor_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["totalReviews"], 1);
    assert_eq!(body["data"]["averageRating"], 4.0);
    assert_eq!(body["data"]["reviews"][0]["comment"], "Thorough");

    // The doctor's satisfaction rate follows the review average.
    let resp = client
        .get(format!("{}/api/onboarding/doctor", base_url))
        .bearer_auth(&doctor_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["satisfactionRate"], "4.00");
}

#[tokio::test]
async fn test_rag_validation_and_upstream_failure() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    // Too short.
    let resp = client
        .post(format!("{}/api/rag/recommend", base_url))
        .json(&json!({"query": "ow"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing entirely.
    let resp = client
        .post(format!("{}/api/rag/recommend", base_url))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Upstream unreachable: surfaced as 502, not a crash.
    let resp = client
        .post(format!("{}/api/rag/recommend", base_url))
        .json(&json!({"query": "headache and fever"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn test_onboarding_step_endpoint() {
    let (base_url, _state, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, _) = register(&client, &base_url, "pat@example.com", "patient").await;

    let resp = client
        .put(format!("{}/api/onboarding/step", base_url))
        .bearer_auth(&token)
        .json(&json!({"step": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/onboarding/status", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["onboardingStep"], 2);
    assert_eq!(body["data"]["isOnboardingComplete"], false);

    let resp = client
        .put(format!("{}/api/onboarding/step", base_url))
        .bearer_auth(&token)
        .json(&json!({"step": 7}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
