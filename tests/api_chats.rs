//! Integration tests for the chat directory endpoints

mod common;

#[cfg(test)]
mod chat_tests {
    use super::common::*;
    use agrichat::entities::Role;
    use agrichat::services::directory;
    use axum_test::TestServer;
    use axum_test::http::HeaderName;
    use serde_json::{Value, json};

    fn authorization() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    async fn create_chat(server: &TestServer, caller: (&str, Role), target: (&str, Role)) -> Value {
        let response = server
            .post("/chats")
            .add_header(authorization(), bearer(caller.0, caller.1))
            .json(&json!({
                "participantId": target.0,
                "participantRole": target.1,
                "context": { "type": "product", "referenceId": "P1" }
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    // ============================================================
    // GET / - health check
    // ============================================================

    #[tokio::test]
    async fn test_root_is_public() {
        let server = create_test_server(create_test_state().await);
        let response = server.get("/").await;
        response.assert_status_ok();
        response.assert_text("Server is running!");
    }

    // ============================================================
    // Authentication
    // ============================================================

    #[tokio::test]
    async fn test_get_chats_without_token() {
        let server = create_test_server(create_test_state().await);
        server.get("/chats").await.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_get_chats_with_invalid_token() {
        let server = create_test_server(create_test_state().await);
        server
            .get("/chats")
            .add_header(authorization(), "Bearer invalid_token_here")
            .await
            .assert_status_unauthorized();
    }

    // ============================================================
    // POST /chats - create-or-get
    // ============================================================

    #[tokio::test]
    async fn test_create_chat_returns_snapshots_and_context() {
        let server = create_test_server(create_test_state().await);

        let chat = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;

        assert!(chat["_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(chat["participants"][0]["userId"], "consumer-1");
        assert_eq!(chat["participants"][0]["role"], "consumer");
        assert_eq!(chat["participants"][0]["name"], "Green Bowl Cafe");
        assert_eq!(chat["participants"][1]["userId"], "farmer-1");
        assert_eq!(chat["participants"][1]["name"], "Ravi Kumar");
        assert_eq!(chat["context"], json!({ "type": "product", "referenceId": "P1" }));
        assert!(chat.get("lastMessage").is_none());
    }

    #[tokio::test]
    async fn test_create_chat_is_idempotent_from_both_sides() {
        let server = create_test_server(create_test_state().await);

        let first = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let again = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let reverse = create_chat(&server, ("farmer-1", Role::Farmer), ("consumer-1", Role::Consumer)).await;

        assert_eq!(first["_id"], again["_id"]);
        assert_eq!(first["_id"], reverse["_id"]);

        let chats: Vec<Value> = server
            .get("/chats")
            .add_header(authorization(), bearer("farmer-1", Role::Farmer))
            .await
            .json();
        assert_eq!(chats.len(), 1);
    }

    #[tokio::test]
    async fn test_create_chat_between_same_roles_is_rejected() {
        let server = create_test_server(create_test_state().await);

        let response = server
            .post("/chats")
            .add_header(authorization(), bearer("farmer-1", Role::Farmer))
            .json(&json!({ "participantId": "farmer-2", "participantRole": "farmer" }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_create_chat_with_unknown_participant() {
        let server = create_test_server(create_test_state().await);

        server
            .post("/chats")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .json(&json!({ "participantId": "farmer-404", "participantRole": "farmer" }))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_create_chat_with_empty_participant_id() {
        let server = create_test_server(create_test_state().await);

        server
            .post("/chats")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .json(&json!({ "participantId": "", "participantRole": "farmer" }))
            .await
            .assert_status_bad_request();
    }

    // ============================================================
    // GET /chats - list
    // ============================================================

    #[tokio::test]
    async fn test_list_chats_orders_by_activity_and_counts_unread() {
        let state = create_test_state().await;
        let server = create_test_server(state.clone());

        let with_f1 = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let with_f2 = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-2", Role::Farmer)).await;
        let f1_chat = with_f1["_id"].as_str().unwrap();

        directory::send_message(&state, f1_chat, "farmer-1", "Tomatoes are ready")
            .await
            .unwrap();
        directory::send_message(&state, f1_chat, "farmer-1", "Pickup tomorrow?")
            .await
            .unwrap();

        let chats: Vec<Value> = server
            .get("/chats")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .json();

        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0]["_id"], with_f1["_id"]);
        assert_eq!(chats[0]["unreadCount"], 2);
        assert_eq!(chats[0]["lastMessage"]["content"], "Pickup tomorrow?");
        assert_eq!(chats[0]["lastMessage"]["senderId"], "farmer-1");
        assert_eq!(chats[1]["_id"], with_f2["_id"]);
        assert_eq!(chats[1]["unreadCount"], 0);

        // the sender has nothing unread
        let farmer_chats: Vec<Value> = server
            .get("/chats")
            .add_header(authorization(), bearer("farmer-1", Role::Farmer))
            .await
            .json();
        assert_eq!(farmer_chats[0]["unreadCount"], 0);
    }

    // ============================================================
    // GET /chats/{chat_id}/messages
    // ============================================================

    #[tokio::test]
    async fn test_get_messages_paginates_from_newest() {
        let state = create_test_state().await;
        let server = create_test_server(state.clone());
        let chat = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let chat_id = chat["_id"].as_str().unwrap();

        for i in 0..5 {
            directory::send_message(&state, chat_id, "consumer-1", &format!("message {i}"))
                .await
                .unwrap();
        }

        let page: Vec<Value> = server
            .get(&format!("/chats/{chat_id}/messages"))
            .add_query_param("page", 1)
            .add_query_param("limit", 2)
            .add_header(authorization(), bearer("farmer-1", Role::Farmer))
            .await
            .json();
        let contents: Vec<&str> = page.iter().map(|m| m["content"].as_str().unwrap()).collect();
        assert_eq!(contents, ["message 3", "message 4"]);
        assert_eq!(page[0]["chatId"], chat_id);
        assert_eq!(page[0]["sender"]["userId"], "consumer-1");
        assert_eq!(page[0]["seenBy"][0]["userId"], "consumer-1");

        let all: Vec<Value> = server
            .get(&format!("/chats/{chat_id}/messages"))
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .json();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0]["content"], "message 0");
    }

    #[tokio::test]
    async fn test_get_messages_of_foreign_chat_is_not_found() {
        let server = create_test_server(create_test_state().await);
        let chat = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let chat_id = chat["_id"].as_str().unwrap();

        server
            .get(&format!("/chats/{chat_id}/messages"))
            .add_header(authorization(), bearer("consumer-2", Role::Consumer))
            .await
            .assert_status_not_found();

        server
            .get("/chats/does-not-exist/messages")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_get_messages_rejects_bad_pagination() {
        let server = create_test_server(create_test_state().await);
        let chat = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let path = format!("/chats/{}/messages", chat["_id"].as_str().unwrap());

        for (key, value) in [("page", "0"), ("limit", "0"), ("limit", "101"), ("page", "abc")] {
            let response = server
                .get(&path)
                .add_query_param(key, value)
                .add_header(authorization(), bearer("consumer-1", Role::Consumer))
                .await;
            assert_eq!(response.status_code(), 400, "{key}={value} should be rejected");
        }
    }

    // ============================================================
    // PUT /chats/{chat_id}/seen
    // ============================================================

    #[tokio::test]
    async fn test_mark_seen_clears_unread_and_is_idempotent() {
        let state = create_test_state().await;
        let server = create_test_server(state.clone());
        let chat = create_chat(&server, ("consumer-1", Role::Consumer), ("farmer-1", Role::Farmer)).await;
        let chat_id = chat["_id"].as_str().unwrap();
        directory::send_message(&state, chat_id, "farmer-1", "hello").await.unwrap();

        let first: Value = server
            .put(&format!("/chats/{chat_id}/seen"))
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .json();
        assert_eq!(first, json!({ "chatId": chat_id, "markedCount": 1 }));

        let second: Value = server
            .put(&format!("/chats/{chat_id}/seen"))
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .json();
        assert_eq!(second["markedCount"], 0);

        let chats: Vec<Value> = server
            .get("/chats")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .json();
        assert_eq!(chats[0]["unreadCount"], 0);

        server
            .put(&format!("/chats/{chat_id}/seen"))
            .add_header(authorization(), bearer("farmer-2", Role::Farmer))
            .await
            .assert_status_not_found();
    }

    // ============================================================
    // GET /chats/profile/{participant_id}/{role}
    // ============================================================

    #[tokio::test]
    async fn test_get_participant_profile() {
        let server = create_test_server(create_test_state().await);

        let profile: Value = server
            .get("/chats/profile/farmer-1/farmer")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .json();
        assert_eq!(profile["userId"], "farmer-1");
        assert_eq!(profile["name"], "Ravi Kumar");
        assert_eq!(profile["location"], "Nashik");

        // right id, wrong role
        server
            .get("/chats/profile/farmer-1/consumer")
            .add_header(authorization(), bearer("consumer-1", Role::Consumer))
            .await
            .assert_status_not_found();
    }
}
