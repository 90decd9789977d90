use std::time::Duration;

use futures_util::future::{join, join_all};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    auth::Principal,
    db::EmergencyContact,
    hospitals::locator::{GeoPoint, HospitalCandidate, HospitalLocator},
    sms::SmsGateway,
    AppResult,
};

pub const EMERGENCY_MESSAGE: &str = "Emergency detected. Please seek immediate medical attention.";
pub const NO_CONTACTS: &str = "No emergency contacts found.";
pub const CONTACTS_NOTIFIED: &str = "Messages sent to emergency contacts.";

#[derive(Debug, Clone, Serialize)]
pub struct ContactNotice {
    pub contact_id: String,
    pub name: String,
    pub phone_number: String,
    pub delivered: bool,
    pub delivery_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyEvent {
    pub message: &'static str,
    pub details: String,
    pub extras: &'static str,
    pub nearest_hospital: Option<HospitalCandidate>,
    pub hospital_error: Option<String>,
    pub notifications: Vec<ContactNotice>,
}

pub fn alert_text(first_name: &str, hospital: Option<&HospitalCandidate>) -> String {
    let hospital = hospital.map_or_else(|| "unavailable".to_owned(), HospitalCandidate::summary);
    format!(
        "Emergency detected. Please contact {first_name} immediately. !!!MEDICAL EMERGENCY!!! nearest hospital details: {hospital}"
    )
}

/// Everything an escalation reaches out to.
pub struct Escalation<'a> {
    pub db_pool: &'a SqlitePool,
    pub locator: &'a HospitalLocator,
    pub sms: &'a SmsGateway,
    pub timeout: Duration,
}

impl Escalation<'_> {
    pub async fn escalate(
        &self,
        principal: &Principal,
        reply: &str,
        location: Option<GeoPoint>,
    ) -> AppResult<EmergencyEvent> {
        tracing::warn!(user_id = %principal.id, "emergency escalation started");

        let lookup = async {
            let Some(location) = location else {
                return Err("no location supplied".to_owned());
            };
            match tokio::time::timeout(self.timeout, self.locator.find_nearest(location)).await {
                Ok(found) => found.map_err(|e| e.to_string()),
                Err(_) => Err("hospital lookup timed out".to_owned()),
            }
        };
        let (lookup, contacts) = join(lookup, EmergencyContact::for_user(self.db_pool, &principal.id)).await;
        let contacts = contacts?;

        let (nearest_hospital, hospital_error) = match lookup {
            Ok(found) => (found, None),
            Err(reason) => {
                tracing::warn!(%reason, "escalating without hospital data");
                (None, Some(reason))
            }
        };

        let body = alert_text(&principal.first_name, nearest_hospital.as_ref());
        let dispatches = contacts
            .iter()
            .filter(|contact| !contact.phone_number.trim().is_empty())
            .map(|contact| self.notify(contact, &body));
        let notifications = join_all(dispatches).await;

        Ok(EmergencyEvent {
            message: EMERGENCY_MESSAGE,
            details: reply.to_owned(),
            extras: if contacts.is_empty() { NO_CONTACTS } else { CONTACTS_NOTIFIED },
            nearest_hospital,
            hospital_error,
            notifications,
        })
    }

    async fn notify(&self, contact: &EmergencyContact, body: &str) -> ContactNotice {
        let sent = match tokio::time::timeout(self.timeout, self.sms.send(&contact.phone_number, body)).await {
            Ok(sent) => sent.map_err(|e| e.to_string()),
            Err(_) => Err("sms dispatch timed out".to_owned()),
        };
        if let Err(error) = &sent {
            tracing::error!(contact_id = %contact.id, %error, "could not alert emergency contact");
        }

        ContactNotice {
            contact_id: contact.id.clone(),
            name: contact.name.clone(),
            phone_number: contact.phone_number.clone(),
            delivered: sent.is_ok(),
            error: sent.as_ref().err().cloned(),
            delivery_id: sent.ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::{config::TwilioConfig, db::testing};

    fn principal() -> Principal {
        Principal {
            id: "u1".to_owned(),
            email: "u1@example.com".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: None,
        }
    }

    fn http_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    fn upstreams(server: &mockito::Server) -> (HospitalLocator, SmsGateway) {
        let locator = HospitalLocator::new(http_client(), format!("{}/api/interpreter", server.url()));
        let sms = SmsGateway::new(http_client(), &TwilioConfig {
            base_url: server.url(),
            account_sid: "AC1".to_owned(),
            auth_token: "t".to_owned(),
            from_number: "+10000000000".to_owned(),
        });
        (locator, sms)
    }

    const SMS_PATH: &str = "/2010-04-01/Accounts/AC1/Messages.json";
    const HOSPITALS: &str = r#"{"elements":[{"type":"node","lat":0.0,"lon":0.01,"tags":{"name":"General"}}]}"#;

    #[tokio::test]
    async fn test_no_contacts_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/api/interpreter").with_body(HOSPITALS).create_async().await;
        let sms_handler = server.mock("POST", SMS_PATH).expect(0).create_async().await;

        let db_pool = testing::pool().await;
        testing::insert_user(&db_pool, "u1", "Ada").await;
        let (locator, sms) = upstreams(&server);
        let escalation = Escalation { db_pool: &db_pool, locator: &locator, sms: &sms, timeout: Duration::from_secs(5) };

        let event = escalation
            .escalate(&principal(), "Emergency: chest pain", Some(GeoPoint::new(0.0, 0.0).unwrap()))
            .await
            .unwrap();

        assert_eq!(event.extras, NO_CONTACTS);
        assert!(event.notifications.is_empty());
        assert_eq!(event.nearest_hospital.unwrap().hospital_name, "General");
        sms_handler.assert_async().await;
    }

    #[tokio::test]
    async fn test_hospital_failure_still_notifies() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/api/interpreter").with_status(500).create_async().await;
        let sms_handler = server
            .mock("POST", SMS_PATH)
            .match_body(Matcher::UrlEncoded("Body".into(), alert_text("Ada", None)))
            .with_status(201)
            .with_body(r#"{"sid":"SM1"}"#)
            .expect(1)
            .create_async()
            .await;

        let db_pool = testing::pool().await;
        testing::insert_user(&db_pool, "u1", "Ada").await;
        testing::insert_contact(&db_pool, "c1", "u1", "+15550001").await;
        let (locator, sms) = upstreams(&server);
        let escalation = Escalation { db_pool: &db_pool, locator: &locator, sms: &sms, timeout: Duration::from_secs(5) };

        let event = escalation
            .escalate(&principal(), "Emergency", Some(GeoPoint::new(0.0, 0.0).unwrap()))
            .await
            .unwrap();

        assert!(event.nearest_hospital.is_none());
        assert!(event.hospital_error.is_some());
        assert_eq!(event.extras, CONTACTS_NOTIFIED);
        assert_eq!(event.notifications.len(), 1);
        assert!(event.notifications[0].delivered);
        assert_eq!(event.notifications[0].delivery_id.as_deref(), Some("SM1"));
        sms_handler.assert_async().await;
    }

    #[tokio::test]
    async fn test_one_failed_dispatch_does_not_block_others() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/api/interpreter").with_body(HOSPITALS).create_async().await;
        server
            .mock("POST", SMS_PATH)
            .match_body(Matcher::UrlEncoded("To".into(), "+15550001".into()))
            .with_status(400)
            .with_body(r#"{"message":"invalid number"}"#)
            .create_async()
            .await;
        server
            .mock("POST", SMS_PATH)
            .match_body(Matcher::UrlEncoded("To".into(), "+15550002".into()))
            .with_status(201)
            .with_body(r#"{"sid":"SM2"}"#)
            .create_async()
            .await;

        let db_pool = testing::pool().await;
        testing::insert_user(&db_pool, "u1", "Ada").await;
        testing::insert_contact(&db_pool, "c1", "u1", "+15550001").await;
        testing::insert_contact(&db_pool, "c2", "u1", "+15550002").await;
        let (locator, sms) = upstreams(&server);
        let escalation = Escalation { db_pool: &db_pool, locator: &locator, sms: &sms, timeout: Duration::from_secs(5) };

        let event = escalation
            .escalate(&principal(), "Emergency", Some(GeoPoint::new(0.0, 0.0).unwrap()))
            .await
            .unwrap();

        let failed = event.notifications.iter().find(|n| n.contact_id == "c1").unwrap();
        let sent = event.notifications.iter().find(|n| n.contact_id == "c2").unwrap();
        assert!(!failed.delivered);
        assert!(failed.error.is_some());
        assert!(sent.delivered);
        assert_eq!(sent.delivery_id.as_deref(), Some("SM2"));
    }

    #[tokio::test]
    async fn test_missing_location_skips_lookup() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server.mock("POST", "/api/interpreter").expect(0).create_async().await;

        let db_pool = testing::pool().await;
        testing::insert_user(&db_pool, "u1", "Ada").await;
        let (locator, sms) = upstreams(&server);
        let escalation = Escalation { db_pool: &db_pool, locator: &locator, sms: &sms, timeout: Duration::from_secs(5) };

        let event = escalation.escalate(&principal(), "Emergency", None).await.unwrap();
        assert_eq!(event.hospital_error.as_deref(), Some("no location supplied"));
        lookup.assert_async().await;
    }

    #[test]
    fn test_alert_text_mentions_hospital() {
        let hospital = HospitalCandidate {
            hospital_name: "General".to_owned(),
            location: GeoPoint { latitude: 1.5, longitude: 2.5 },
            distance: 0.42,
        };
        let text = alert_text("Ada", Some(&hospital));
        assert!(text.starts_with("Emergency detected. Please contact Ada immediately."));
        assert!(text.ends_with("General (0.42 km away, at 1.5, 2.5)"));
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let event = EmergencyEvent {
            message: EMERGENCY_MESSAGE,
            details: "Emergency".to_owned(),
            extras: CONTACTS_NOTIFIED,
            nearest_hospital: None,
            hospital_error: Some("no location supplied".to_owned()),
            notifications: vec![ContactNotice {
                contact_id: "c1".to_owned(),
                name: "Bo".to_owned(),
                phone_number: "+15550001".to_owned(),
                delivered: true,
                delivery_id: Some("SM1".to_owned()),
                error: None,
            }],
        };

        let body = serde_json::to_value(&event).unwrap();
        assert!(body["nearest_hospital"].is_null());
        assert_eq!(body["hospital_error"], "no location supplied");
        assert_eq!(body["notifications"][0]["contact_id"], "c1");
        assert_eq!(body["notifications"][0]["delivery_id"], "SM1");
    }
}
