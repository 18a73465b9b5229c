//! Delivery semantics of the realtime gateway, exercised without a live
//! database: connections are registered and rooms joined directly, and the
//! pool behind the gateway is lazy and never touched.

use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

use palaver::auth::sessions::create_token;
use palaver::realtime::{ClientEvent, RealtimeGateway, ServerEvent};

fn gateway() -> RealtimeGateway {
    // Lazy pool: no connection is attempted until a query runs, and these
    // tests never run one.
    let pool = PgPool::connect_lazy("postgres://localhost/never_connected")
        .expect("lazy pool construction");
    RealtimeGateway::new(pool)
}

/// Register a connection and authenticate it as `user` via the same setup
/// path the socket uses.
async fn connected_client(
    gw: &RealtimeGateway,
    user: Uuid,
) -> (
    palaver::realtime::ConnectionId,
    mpsc::UnboundedReceiver<ServerEvent>,
) {
    let id = gw.open_connection();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let token = create_token(user, format!("{user}@example.com")).expect("token");
    gw.handle_event(id, &tx, ClientEvent::Setup { token }).await;

    // Setup is acknowledged before anything else is delivered.
    assert_eq!(rx.try_recv().ok(), Some(ServerEvent::Connected));
    (id, rx)
}

#[tokio::test]
async fn setup_with_garbage_token_binds_nothing() {
    let gw = gateway();
    let id = gw.open_connection();
    let (tx, mut rx) = mpsc::unbounded_channel();

    gw.handle_event(
        id,
        &tx,
        ClientEvent::Setup {
            token: "not.a.jwt".to_string(),
        },
    )
    .await;

    assert!(rx.try_recv().is_err());
    assert!(gw.registry().is_empty());
}

#[tokio::test]
async fn broadcast_reaches_only_joined_connections() {
    let gw = gateway();
    let chat = Uuid::new_v4();

    let (alice_conn, mut alice_rx) = connected_client(&gw, Uuid::new_v4()).await;
    let (_bob_conn, mut bob_rx) = connected_client(&gw, Uuid::new_v4()).await;

    gw.join_room(alice_conn, chat);

    let delivered = gw.broadcast_to_room(chat, ServerEvent::ChatDeleted { chat_id: chat });
    assert_eq!(delivered, 1);

    assert_eq!(
        alice_rx.try_recv().ok(),
        Some(ServerEvent::ChatDeleted { chat_id: chat })
    );
    // Bob authenticated but never joined; he hears nothing.
    assert!(bob_rx.try_recv().is_err());
}

#[tokio::test]
async fn broadcast_includes_every_joined_handle_of_a_user() {
    let gw = gateway();
    let chat = Uuid::new_v4();
    let user = Uuid::new_v4();

    let (tab_one, mut rx_one) = connected_client(&gw, user).await;
    let (tab_two, mut rx_two) = connected_client(&gw, user).await;
    gw.join_room(tab_one, chat);
    gw.join_room(tab_two, chat);

    let delivered = gw.broadcast_to_room(chat, ServerEvent::ChatDeleted { chat_id: chat });
    assert_eq!(delivered, 2);
    assert!(rx_one.try_recv().is_ok());
    assert!(rx_two.try_recv().is_ok());
}

#[tokio::test]
async fn typing_is_excluded_by_user_not_by_connection() {
    let gw = gateway();
    let chat = Uuid::new_v4();
    let typist = Uuid::new_v4();

    // The typist has two tabs, both joined; a second user has one.
    let (typist_tab_one, mut typist_rx_one) = connected_client(&gw, typist).await;
    let (typist_tab_two, mut typist_rx_two) = connected_client(&gw, typist).await;
    let (peer_conn, mut peer_rx) = connected_client(&gw, Uuid::new_v4()).await;
    gw.join_room(typist_tab_one, chat);
    gw.join_room(typist_tab_two, chat);
    gw.join_room(peer_conn, chat);

    let (tx, _keep) = mpsc::unbounded_channel();
    gw.handle_event(typist_tab_one, &tx, ClientEvent::Typing { chat_id: chat })
        .await;

    // Neither of the typist's tabs sees the echo, the peer does.
    assert!(typist_rx_one.try_recv().is_err());
    assert!(typist_rx_two.try_recv().is_err());
    assert_eq!(
        peer_rx.try_recv().ok(),
        Some(ServerEvent::Typing { chat_id: chat })
    );
}

#[tokio::test]
async fn typing_before_setup_is_dropped() {
    let gw = gateway();
    let chat = Uuid::new_v4();

    let (member, mut member_rx) = connected_client(&gw, Uuid::new_v4()).await;
    gw.join_room(member, chat);

    let stranger = gw.open_connection();
    let (tx, _rx) = mpsc::unbounded_channel();
    gw.handle_event(stranger, &tx, ClientEvent::Typing { chat_id: chat })
        .await;

    assert!(member_rx.try_recv().is_err());
}

#[tokio::test]
async fn disconnect_stops_all_delivery() {
    let gw = gateway();
    let chat = Uuid::new_v4();
    let user = Uuid::new_v4();

    let (conn, mut rx) = connected_client(&gw, user).await;
    gw.join_room(conn, chat);

    gw.disconnect(conn);

    let delivered = gw.broadcast_to_room(chat, ServerEvent::ChatDeleted { chat_id: chat });
    assert_eq!(delivered, 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(gw.notify_user(user, ServerEvent::Connected), 0);
    assert!(gw.rooms().members_of(chat).is_empty());
}

#[tokio::test]
async fn notify_user_hits_every_handle_and_nobody_else() {
    let gw = gateway();
    let user = Uuid::new_v4();

    let (_tab_one, mut rx_one) = connected_client(&gw, user).await;
    let (_tab_two, mut rx_two) = connected_client(&gw, user).await;
    let (_other, mut other_rx) = connected_client(&gw, Uuid::new_v4()).await;

    let delivered = gw.notify_user(user, ServerEvent::Connected);
    assert_eq!(delivered, 2);
    assert!(rx_one.try_recv().is_ok());
    assert!(rx_two.try_recv().is_ok());
    assert!(other_rx.try_recv().is_err());
}

#[tokio::test]
async fn dead_handle_does_not_block_the_room() {
    let gw = gateway();
    let chat = Uuid::new_v4();

    let (dead_conn, dead_rx) = connected_client(&gw, Uuid::new_v4()).await;
    let (live_conn, mut live_rx) = connected_client(&gw, Uuid::new_v4()).await;
    gw.join_room(dead_conn, chat);
    gw.join_room(live_conn, chat);

    // Simulate a client that vanished without a close frame.
    drop(dead_rx);

    let delivered = gw.broadcast_to_room(chat, ServerEvent::ChatDeleted { chat_id: chat });
    assert_eq!(delivered, 1);
    assert!(live_rx.try_recv().is_ok());
}
