use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use p256::SecretKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{EncodePrivateKey, LineEnding};
use passport_cri_auth::config::ClientConfig;
use passport_cri_auth::credential::{
    DcsResponse, Evidence, Gpg45Evidence, IdentityCheckRecord, PassportAttributes,
};
use passport_cri_auth::jar::{ContentEncryption, RsaOaepEncrypter};
use passport_cri_server::{AppConfig, IssuerApp, build_app};
use rand::rngs::OsRng;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::date;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

const CLIENT_ID: &str = "ipv-core";
const REDIRECT_URI: &str = "https://ipv.example.com/callback";
const AUDIENCE: &str = "https://passport.cri.example.com";

struct Client {
    signing_key: EncodingKey,
    jwk: String,
}

fn client_key() -> Client {
    let secret_key = SecretKey::random(&mut OsRng);
    let pem = secret_key.to_pkcs8_pem(LineEnding::LF).expect("pem");
    let point = secret_key.public_key().to_encoded_point(false);
    Client {
        signing_key: EncodingKey::from_ec_pem(pem.as_bytes()).expect("encoding key"),
        jwk: json!({
            "kty": "EC",
            "crv": "P-256",
            "x": URL_SAFE_NO_PAD.encode(point.x().expect("x")),
            "y": URL_SAFE_NO_PAD.encode(point.y().expect("y")),
        })
        .to_string(),
    }
}

fn config(client: &Client) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.issuer.audience = AUDIENCE.to_string();
    cfg.issuer.clients.insert(
        CLIENT_ID.to_string(),
        ClientConfig {
            issuer: CLIENT_ID.to_string(),
            signing_key: client.jwk.clone(),
            redirect_uris: vec![REDIRECT_URI.to_string()],
        },
    );
    cfg
}

async fn start_server(app: axum::Router) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn request_object(client: &Client, app: &IssuerApp, claims: &Value) -> String {
    let jws = jsonwebtoken::encode(&Header::new(Algorithm::ES256), claims, &client.signing_key)
        .expect("sign");
    RsaOaepEncrypter::new(app.decryption_public_key.clone(), ContentEncryption::A256Gcm)
        .encrypt(&jws)
        .expect("encrypt")
}

fn claims() -> Value {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    json!({
        "iss": CLIENT_ID,
        "sub": "urn:uuid:0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b",
        "aud": AUDIENCE,
        "exp": now + 10 * 60,
        "nbf": now,
        "iat": now,
        "response_type": "code",
        "client_id": CLIENT_ID,
        "redirect_uri": REDIRECT_URI,
        "state": "xyz",
    })
}

fn identity_check(resource_id: &str) -> IdentityCheckRecord {
    let request_id = Uuid::new_v4();
    let correlation_id = Uuid::new_v4();
    IdentityCheckRecord {
        resource_id: resource_id.to_string(),
        attributes: Some(PassportAttributes {
            passport_number: Some("123456789".to_string()),
            surname: Some("Smith".to_string()),
            forenames: Some(vec!["John".to_string()]),
            date_of_birth: Some(date!(1980 - 05 - 17)),
            expiry_date: Some(date!(2031 - 08 - 01)),
            request_id: Some(request_id),
            correlation_id: Some(correlation_id),
            dcs_response: Some(DcsResponse {
                correlation_id,
                request_id,
                error: false,
                valid: true,
                error_message: None,
            }),
            name_validity: None,
        }),
        gpg45_score: Some(Evidence {
            gpg45_evidence: Gpg45Evidence {
                strength: 4,
                validity: 2,
            },
        }),
    }
}

fn decode_segment(token: &str, index: usize) -> Value {
    let segment = token.split('.').nth(index).expect("segment");
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).expect("base64")).expect("json")
}

#[tokio::test]
async fn server_endpoints_work() {
    let client = client_key();
    let app = build_app(&config(&client)).expect("build app");
    let jwe = request_object(&client, &app, &claims());
    let mut expired = claims();
    expired["exp"] = json!(OffsetDateTime::now_utc().unix_timestamp() - 60);
    let expired_jwe = request_object(&client, &app, &expired);

    let resource_id = "resource-42";
    app.access_tokens.insert("access-token-42", resource_id);
    app.identity_checks.insert(identity_check(resource_id));
    let codes = app.authorization_codes.clone();

    let (base, shutdown_tx, handle) = start_server(app.router).await;
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    // GET /health
    let resp = http.get(format!("{base}/health")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // GET /authorization with a valid request object
    let resp = http
        .get(format!("{base}/authorization"))
        .query(&[("client_id", CLIENT_ID), ("request", jwe.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::FOUND);
    let location = Url::parse(
        resp.headers()
            .get(reqwest::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert!(location.as_str().starts_with(REDIRECT_URI));
    let params: Vec<(String, String)> = location.query_pairs().into_owned().collect();
    assert!(params.iter().any(|(k, v)| k == "code" && !v.is_empty()));
    assert!(params.iter().any(|(k, v)| k == "state" && v == "xyz"));
    assert_eq!(codes.len(), 1);

    // GET /authorization with an expired request object redirects with an error
    let resp = http
        .get(format!("{base}/authorization"))
        .query(&[("client_id", CLIENT_ID), ("request", expired_jwe.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::FOUND);
    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        location,
        format!("{REDIRECT_URI}?error=invalid_grant&error_description=Expired+JWT&state=xyz")
    );
    assert_eq!(codes.len(), 1);

    // GET /authorization from an unregistered client is fatal
    let resp = http
        .get(format!("{base}/authorization"))
        .query(&[("client_id", "unknown"), ("request", jwe.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_client");

    // POST /credential/issue
    let request_jwt = format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(r#"{"sub":"urn:uuid:subject"}"#)
    );
    let resp = http
        .post(format!("{base}/credential/issue"))
        .bearer_auth("access-token-42")
        .body(request_jwt.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_TYPE).unwrap(),
        "application/jwt"
    );
    let vc_jwt = resp.text().await.unwrap();
    assert_eq!(decode_segment(&vc_jwt, 0)["alg"], "RS256");
    let payload = decode_segment(&vc_jwt, 1);
    assert_eq!(payload["sub"], "urn:uuid:subject");
    assert_eq!(payload["vc"]["resourceId"], resource_id);
    assert_eq!(
        payload["vc"]["credentialSubject"]["name"]["nameParts"][1]["value"],
        "Smith"
    );
    assert_eq!(payload["vc"]["evidence"]["gpg45Evidence"]["strength"], 4);

    // POST /credential/issue with an unknown token
    let resp = http
        .post(format!("{base}/credential/issue"))
        .bearer_auth("someone-elses-token")
        .body(request_jwt)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "access_denied");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
