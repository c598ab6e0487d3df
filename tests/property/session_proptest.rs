//! Property-based tests for the session model and token store

use proptest::prelude::*;
use std::sync::Arc;
use storefront::client::{MemoryStorage, Session, SessionUpdate, TokenStore, UserProjection, UserSnapshot};
use storefront::shared::RoleName;

fn role() -> impl Strategy<Value = RoleName> {
    prop_oneof![
        Just(RoleName::Owner),
        Just(RoleName::Admin),
        Just(RoleName::Manager),
        Just(RoleName::Staff),
        Just(RoleName::Customer),
        "[A-Z]{3,10}".prop_map(RoleName::from),
    ]
}

prop_compose! {
    fn user()(
        id in "[a-z]{1,8}",
        display_name in prop::option::of("[A-Za-z ]{0,12}"),
        mobile_number in prop::option::of("[0-9]{10}"),
        roles in prop::collection::btree_set(role(), 0..4),
        permissions in prop::collection::vec("[a-z.]{1,12}", 0..4),
        mobile_confirmed in any::<bool>(),
    ) -> UserSnapshot {
        UserSnapshot { id, display_name, mobile_number, roles, permissions, mobile_confirmed }
    }
}

prop_compose! {
    fn update()(
        access_token in prop::option::of("[A-Za-z0-9]{8,16}"),
        refresh_token in prop::option::of("[A-Za-z0-9]{8,16}"),
        user in prop::option::of(user()),
    ) -> SessionUpdate {
        SessionUpdate { access_token, refresh_token, user }
    }
}

proptest! {
    #[test]
    fn test_apply_keeps_fields_the_update_omits(first in update(), second in update()) {
        let mut session = Session::default();
        session.apply(first.clone());
        session.apply(second.clone());

        prop_assert_eq!(session.access_token, second.access_token.or(first.access_token));
        prop_assert_eq!(session.refresh_token, second.refresh_token.or(first.refresh_token));
        prop_assert_eq!(session.user, second.user.or(first.user));
    }

    #[test]
    fn test_projection_never_carries_mobile_number(user in user()) {
        let json = serde_json::to_string(&UserProjection::from(&user)).unwrap();

        if let Some(mobile) = &user.mobile_number {
            prop_assert!(!json.contains(mobile.as_str()));
        }

        let restored = UserSnapshot::from(serde_json::from_str::<UserProjection>(&json).unwrap());
        prop_assert_eq!(restored.id, user.id);
        prop_assert_eq!(restored.roles, user.roles);
        prop_assert_eq!(restored.mobile_confirmed, user.mobile_confirmed);
    }

    #[test]
    fn test_clear_twice_equals_clear_once(update in update(), loading in any::<bool>()) {
        let (once, twice, keys) = tokio_test::block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            let store = TokenStore::new(storage.clone());
            store.set(update).await;
            store.set_loading(loading).await;

            store.clear().await;
            let once = store.get().await;
            store.clear().await;
            let twice = store.get().await;
            (once, twice, storage.keys().await)
        });

        prop_assert_eq!(&once, &Session::default());
        prop_assert_eq!(once, twice);
        prop_assert!(keys.is_empty());
    }

    #[test]
    fn test_restore_returns_what_was_persisted(update in update()) {
        let (written, restored) = tokio_test::block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            let store = TokenStore::new(storage.clone());
            store.set(update).await;
            let written = store.get().await;
            let restored = TokenStore::restore(storage).await.get().await;
            (written, restored)
        });

        prop_assert_eq!(restored.access_token, written.access_token);
        prop_assert!(restored.refresh_token.is_none());
        prop_assert_eq!(
            restored.user.map(|user| UserProjection::from(&user)),
            written.user.map(|user| UserProjection::from(&user))
        );
    }

    #[test]
    fn test_role_names_survive_the_wire(role in role()) {
        let json = serde_json::to_string(&role).unwrap();
        let back: RoleName = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(back, role);
    }
}
