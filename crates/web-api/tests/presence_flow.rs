//! 在线状态流程测试
//!
//! 覆盖连接/断开时的在线集合广播、同一用户重连的覆盖语义，
//! 以及迟到断开不影响新连接的记录。

mod support;

use std::time::Duration;

use reqwest::Client;

use support::{
    build_context, connect_ws, expect_online_users, expect_silence, register_and_login,
    spawn_server,
};

#[tokio::test]
async fn presence_set_follows_connects_and_disconnects() {
    let context = build_context().await;
    let (addr, shutdown_tx) = spawn_server(context.router).await;
    let base_http = format!("http://{addr}");
    let client = Client::new();

    let (user1_id, token1) = register_and_login(&client, &base_http, "user1").await;
    let (user2_id, token2) = register_and_login(&client, &base_http, "user2").await;

    // user1 连接：收到只含自己的在线集合
    let mut ws1 = connect_ws(addr, &token1).await;
    let online = expect_online_users(&mut ws1).await;
    assert_eq!(online, vec![user1_id.to_string()], "user1 连接后应该只有自己在线");

    // user2 连接：两条连接都收到完整集合
    let mut ws2 = connect_ws(addr, &token2).await;
    let mut expected = vec![user1_id.to_string(), user2_id.to_string()];
    expected.sort();

    let online1 = expect_online_users(&mut ws1).await;
    let online2 = expect_online_users(&mut ws2).await;
    assert_eq!(online1, expected, "user1 应该看到两个在线用户");
    assert_eq!(online2, expected, "user2 应该看到两个在线用户");

    // user1 断开：user2 收到缩小后的集合
    ws1.close(None).await.expect("close ws1");
    let online = expect_online_users(&mut ws2).await;
    assert_eq!(online, vec![user2_id.to_string()], "user1 断开后应该只剩 user2");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn reconnect_replaces_entry_and_stale_disconnect_is_ignored() {
    let context = build_context().await;
    let (addr, shutdown_tx) = spawn_server(context.router).await;
    let base_http = format!("http://{addr}");
    let client = Client::new();

    let (observer_id, observer_token) = register_and_login(&client, &base_http, "observer").await;
    let (user_id, user_token) = register_and_login(&client, &base_http, "flaky").await;

    // 观察者先上线
    let mut observer_ws = connect_ws(addr, &observer_token).await;
    expect_online_users(&mut observer_ws).await;

    let mut expected = vec![observer_id.to_string(), user_id.to_string()];
    expected.sort();

    // 旧连接上线
    let old_ws = connect_ws(addr, &user_token).await;
    assert_eq!(expect_online_users(&mut observer_ws).await, expected);

    // 旧连接未断开时用新连接重连：注册表仍然只有一条记录，
    // 集合内容不变但作为一次变更重新广播
    let mut new_ws = connect_ws(addr, &user_token).await;
    assert_eq!(expect_online_users(&mut observer_ws).await, expected);
    assert_eq!(expect_online_users(&mut new_ws).await, expected);

    // 旧连接迟到的断开是空操作：不广播，也不把用户踢下线
    drop(old_ws);
    expect_silence(&mut observer_ws, Duration::from_millis(300)).await;

    // 新连接断开才真正让用户下线
    new_ws.close(None).await.expect("close new ws");
    assert_eq!(
        expect_online_users(&mut observer_ws).await,
        vec![observer_id.to_string()],
        "新连接断开后用户应该下线"
    );

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn websocket_requires_valid_token() {
    let context = build_context().await;
    let (addr, shutdown_tx) = spawn_server(context.router).await;

    // 无 token
    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1/ws")).await;
    assert!(result.is_err(), "缺少 token 的连接应该被拒绝");

    // 伪造 token
    let result =
        tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1/ws?token=invalid-token"))
            .await;
    assert!(result.is_err(), "非法 token 的连接应该被拒绝");

    let _ = shutdown_tx.send(());
}
