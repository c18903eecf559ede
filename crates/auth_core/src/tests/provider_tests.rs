use super::*;
use crate::{
    test_support::{Credentials, Op, TestAuthService, TestUser},
    AuthState, ReadinessCheck,
};

#[tokio::test]
async fn accessors_fail_without_a_provider() {
    let auth = create_auth(TestAuthService::signed_out());
    let scope = Scope::root();

    let err = auth.use_auth(&scope).err().expect("missing context");
    assert_eq!(err, MissingContextError::new(scope.id()));
    assert!(auth.use_auth_state(&scope).is_err());
}

#[test]
fn provide_outside_a_runtime_returns_an_error() {
    let service = TestAuthService::signed_out();
    let auth = create_auth(Arc::clone(&service));
    let scope = Scope::root();

    let err = auth
        .provide(&scope, AuthSeed::Unknown)
        .err()
        .expect("no runtime");

    assert_eq!(err, RuntimeUnavailableError);
    assert!(auth.use_auth(&scope).is_err());
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn provider_runs_readiness_check_on_mount() {
    let service = TestAuthService::signed_in_as(TestUser { id: 1 });
    let auth = create_auth(Arc::clone(&service));
    let scope = Scope::root();

    let provider = auth.provide(&scope, AuthSeed::Unknown).expect("provide");
    provider.controller().wait_ready().await;

    assert_eq!(service.call_count(Op::Init), 1);
    assert_eq!(service.call_count(Op::IsAuthenticated), 1);
    let state = auth.use_auth_state(&scope).expect("live state").get();
    assert_eq!(state, AuthState::authenticated(TestUser { id: 1 }));
}

#[tokio::test]
async fn use_auth_returns_handle_sharing_the_provider_state() {
    let service = TestAuthService::signed_out();
    service.issue_user(TestUser { id: 7 });
    let auth = create_auth(Arc::clone(&service));
    let scope = Scope::root();
    let provider = auth.provide(&scope, AuthSeed::Unknown).expect("provide");
    let mut live = auth.use_auth_state(&scope).expect("live state");
    assert_eq!(live.ready().await, Some(AuthState::unauthenticated()));

    let handle = auth.use_auth(&scope).expect("auth handle");
    let user = handle
        .sign_in(Credentials::new("a@b.com", "x"))
        .await
        .expect("sign in");

    assert_eq!(user, TestUser { id: 7 });
    assert_eq!(live.get(), AuthState::authenticated(TestUser { id: 7 }));
    assert_eq!(provider.controller().state(), live.get());

    handle.sign_out().await.expect("sign out");
    assert_eq!(live.get(), AuthState::unauthenticated());
}

#[tokio::test]
async fn child_scopes_find_the_nearest_provider() {
    let auth = create_auth(TestAuthService::signed_out());
    let root = Scope::root();
    let child = root.child();
    let grandchild = child.child();
    let sibling = Scope::root();

    let outer = auth.provide(&root, AuthSeed::Unknown).expect("provide");
    let from_grandchild = auth.use_auth(&grandchild).expect("inherits root");
    assert_eq!(from_grandchild.state(), outer.controller().state());
    assert!(auth.use_auth(&sibling).is_err());

    let inner = auth
        .provide(&child, AuthSeed::User(TestUser { id: 42 }))
        .expect("provide");
    let nearest = auth.use_auth(&grandchild).expect("nearest provider");
    assert_eq!(nearest.state(), AuthState::authenticated(TestUser { id: 42 }));
    assert_eq!(nearest.state(), inner.controller().state());

    drop(inner);
    let fallback = auth.use_auth(&grandchild).expect("falls back to root");
    assert_eq!(fallback.state(), outer.controller().state());
}

#[tokio::test]
async fn latest_provider_on_the_same_scope_wins_until_dropped() {
    let auth = create_auth(TestAuthService::signed_out());
    let scope = Scope::root();

    let first = auth.provide(&scope, AuthSeed::Unknown).expect("provide");
    let second = auth
        .provide(&scope, AuthSeed::User(TestUser { id: 2 }))
        .expect("provide");
    assert_eq!(
        auth.use_auth(&scope).expect("second").state(),
        second.controller().state()
    );

    drop(second);
    assert_eq!(
        auth.use_auth(&scope).expect("first").state(),
        first.controller().state()
    );
}

#[tokio::test]
async fn dropping_the_provider_unregisters_and_cancels() {
    let service = TestAuthService::signed_out();
    let _gate = service.gate(Op::Init);
    let auth = create_auth(Arc::clone(&service));
    let scope = Scope::root();

    let provider = auth.provide(&scope, AuthSeed::Unknown).expect("provide");
    let handle = provider.controller().clone();
    assert_eq!(provider.scope(), scope.id());
    drop(provider);

    assert!(auth.use_auth(&scope).is_err());
    assert!(handle.is_shut_down());
    assert_eq!(handle.wait_ready().await, ReadinessCheck::Cancelled);
    assert_eq!(handle.state(), AuthState::unready());
}

#[tokio::test]
async fn dropping_live_state_releases_its_subscription() {
    let auth = create_auth(TestAuthService::signed_out());
    let scope = Scope::root();
    let provider = auth.provide(&scope, AuthSeed::Unknown).expect("provide");
    let emitter = provider.controller().state_change().clone();
    let baseline = emitter.listener_count();

    {
        let _live = auth.use_auth_state(&scope).expect("live state");
        assert_eq!(emitter.listener_count(), baseline + 1);
    }

    assert_eq!(emitter.listener_count(), baseline);
}

#[tokio::test]
async fn factory_exposes_the_shared_service() {
    let service = TestAuthService::signed_out();
    let auth = create_auth(Arc::clone(&service));
    let scope = Scope::root();
    let provider = auth.provide(&scope, AuthSeed::Unknown).expect("provide");

    assert!(Arc::ptr_eq(auth.service(), provider.controller().service()));
    assert!(!auth.service().is_authenticated().await.expect("check"));
}
