//! Behaviour the memory stores share with their PostgreSQL counterparts.

use std::sync::Arc;

use parlor_core::roles::ROLE_USER;
use parlor_db::memory::{MemoryPersonaStore, MemoryUserStore};
use parlor_db::models::persona::CreatePersona;
use parlor_db::models::user::CreateUser;
use parlor_db::stores::{PersonaStore, UserStore};
use uuid::Uuid;

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        name: "Test".into(),
        email: email.into(),
        password_hash: "hash".into(),
        role: ROLE_USER.into(),
        verification_token: None,
    }
}

fn persona_of(owner_id: Uuid, name: &str) -> CreatePersona {
    CreatePersona {
        owner_id,
        name: name.into(),
        description: None,
        is_ai_agent: false,
        ai_config: None,
    }
}

#[tokio::test]
async fn deleting_a_user_removes_their_personas() {
    let personas = Arc::new(MemoryPersonaStore::new());
    let users = MemoryUserStore::with_personas(Arc::clone(&personas));

    let alice = users.create(&new_user("alice@example.com")).await.unwrap();
    let bob = users.create(&new_user("bob@example.com")).await.unwrap();
    let amy = personas.create(&persona_of(alice.id, "Amy")).await.unwrap();
    let ann = personas.create(&persona_of(alice.id, "Ann")).await.unwrap();
    let bea = personas.create(&persona_of(bob.id, "Bea")).await.unwrap();

    assert!(users.delete(alice.id).await.unwrap());

    assert!(personas.find_by_id(amy.id).await.unwrap().is_none());
    assert!(personas.find_by_id(ann.id).await.unwrap().is_none());
    assert!(personas.list_by_owner(alice.id).await.unwrap().is_empty());
    assert!(personas.find_by_id(bea.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_an_unknown_user_touches_nothing() {
    let personas = Arc::new(MemoryPersonaStore::new());
    let users = MemoryUserStore::with_personas(Arc::clone(&personas));
    let orphan_owner = Uuid::new_v4();
    let kept = personas.create(&persona_of(orphan_owner, "Kept")).await.unwrap();

    assert!(!users.delete(orphan_owner).await.unwrap());
    assert!(personas.find_by_id(kept.id).await.unwrap().is_some());
}
