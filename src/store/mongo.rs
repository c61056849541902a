use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::{
    options::{ClientOptions, FindOneAndUpdateOptions, ReturnDocument},
    Client, Collection, Database,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::{StoreError, UserStore};
use crate::model::{User, UserPatch};

const COLLECTION: &str = "users";

/// Stored shape of a user. The id lives in `_id` as a string; documents
/// written by other tools may hold a native ObjectId there instead.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id", deserialize_with = "id_from_bson")]
    id: String,
    name: String,
    age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    #[serde(default)]
    interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anonymous: Option<bool>,
    #[serde(default)]
    users_visibility: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<bson::DateTime>,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            age: user.age,
            gender: user.gender.clone(),
            interests: user.interests.clone(),
            anonymous: user.anonymous,
            users_visibility: user.users_visibility.clone(),
            created_at: user.created_at.map(bson::DateTime::from_chrono),
        }
    }
}

impl From<UserDocument> for User {
    fn from(document: UserDocument) -> Self {
        Self {
            id: document.id,
            name: document.name,
            age: document.age,
            gender: document.gender,
            interests: document.interests,
            anonymous: document.anonymous,
            users_visibility: document.users_visibility,
            created_at: document.created_at.map(|t| t.to_chrono()),
        }
    }
}

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connects to `uri` and pings `database` so a bad address fails at startup.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client_options = ClientOptions::parse(uri).await?;
        let database = Client::with_options(client_options)?.database(database);

        database.run_command(doc! { "ping": 1 }, None).await?;
        info!(database = database.name(), "Connected to MongoDB");

        Ok(Self::new(&database))
    }

    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection::<Document>(COLLECTION),
        }
    }
}

fn id_from_bson<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Bson::deserialize(deserializer)? {
        Bson::String(id) => Ok(id),
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        other => Err(de::Error::custom(format!(
            "unsupported _id type {:?}",
            other.element_type()
        ))),
    }
}

/// Matches `id` stored either as a string or, when it is ObjectId hex, as a
/// native ObjectId.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [id, oid] } },
        Err(_) => doc! { "_id": id },
    }
}

fn decode(document: Document) -> Result<User, StoreError> {
    Ok(bson::from_document::<UserDocument>(document)?.into())
}

/// Decodes every document, skipping the ones that don't fit the user shape.
fn decode_all(documents: Vec<Document>) -> Vec<User> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("_id").cloned();
            decode(document)
                .map_err(|e| warn!(?id, "Skipping undecodable user document: {e}"))
                .ok()
        })
        .collect()
}

fn interests_filter(interests: &[String]) -> Document {
    doc! { "interests": { "$in": interests.to_vec() } }
}

fn set_document(patch: UserPatch) -> Document {
    let mut set = Document::new();
    if let Some(interests) = patch.interests {
        set.insert("interests", interests);
    }
    if let Some(users_visibility) = patch.users_visibility {
        set.insert("usersVisibility", users_visibility);
    }
    if let Some(anonymous) = patch.anonymous {
        set.insert("anonymous", anonymous);
    }
    doc! { "$set": set }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn all(&self) -> Result<Vec<User>, StoreError> {
        let documents = self
            .collection
            .find(None, None)
            .await?
            .try_collect::<Vec<Document>>()
            .await?;

        Ok(decode_all(documents))
    }

    async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.collection
            .find_one(id_filter(id), None)
            .await?
            .map(decode)
            .transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let document = bson::to_document(&UserDocument::from(user))?;
        self.collection.insert_one(document, None).await?;
        Ok(())
    }

    async fn with_any_interest(&self, interests: &[String]) -> Result<Vec<User>, StoreError> {
        let documents = self
            .collection
            .find(interests_filter(interests), None)
            .await?
            .try_collect::<Vec<Document>>()
            .await?;

        Ok(decode_all(documents))
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>, StoreError> {
        if patch.is_empty() {
            return self.get(id).await;
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(id_filter(id), set_document(patch), options)
            .await?
            .map(decode)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn user_is_stored_under_underscore_id() {
        let user = User {
            id: "65f1c0ffee00000000000001".to_string(),
            name: "Ann".to_string(),
            age: 30,
            gender: Some("f".to_string()),
            interests: vec!["hiking".to_string()],
            anonymous: None,
            users_visibility: vec!["bob".to_string()],
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        };

        let document = bson::to_document(&UserDocument::from(&user)).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), user.id);
        assert!(document.get("id").is_none());
        assert!(document.get("anonymous").is_none());
        assert_eq!(
            document.get_array("usersVisibility").unwrap(),
            &vec![bson::Bson::String("bob".to_string())]
        );

        assert_eq!(decode(document).unwrap(), user);
    }

    #[test]
    fn legacy_documents_decode_with_defaults() {
        let document = doc! { "_id": "abc", "id": 7, "name": "Bob", "age": 41_i64 };
        let user = decode(document).unwrap();
        assert_eq!(user.id, "abc");
        assert_eq!(user.age, 41);
        assert!(user.interests.is_empty());
        assert!(user.users_visibility.is_empty());
    }

    #[test]
    fn undecodable_documents_are_skipped() {
        let documents = vec![
            doc! { "_id": "abc", "name": "Bob", "age": 41 },
            doc! { "_id": "def", "name": "No age" },
        ];
        let users = decode_all(documents);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "abc");
    }

    #[test]
    fn patch_becomes_set_of_present_fields() {
        let patch = UserPatch {
            users_visibility: Some(vec!["bob".to_string()]),
            anonymous: Some(false),
            ..UserPatch::default()
        };
        assert_eq!(
            set_document(patch),
            doc! { "$set": { "usersVisibility": ["bob"], "anonymous": false } }
        );
    }

    #[test]
    fn overlap_filter_uses_in() {
        let filter = interests_filter(&["chess".to_string(), "jazz".to_string()]);
        assert_eq!(filter, doc! { "interests": { "$in": ["chess", "jazz"] } });
    }

    #[test]
    fn native_object_ids_decode_as_hex() {
        let oid = ObjectId::new();
        let user = decode(doc! { "_id": oid, "name": "Dee", "age": 22 }).unwrap();
        assert_eq!(user.id, oid.to_hex());

        assert!(decode(doc! { "_id": 12, "name": "Dee", "age": 22 }).is_err());
    }

    #[test]
    fn id_filter_accepts_both_forms_of_object_id() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        assert_eq!(
            id_filter(&hex),
            doc! { "_id": { "$in": [hex.clone(), oid] } }
        );
        assert_eq!(id_filter("doesnotexist"), doc! { "_id": "doesnotexist" });
    }
}
