//! 单个 WebSocket 连接的读写循环
//!
//! 写任务独占 socket 的发送端，从会话的出站队列取帧写出；
//! 读任务按到达顺序把文本帧交给 [`ConnectionHub`]。任意一端结束即视为断开。

use std::sync::Arc;

use application::{ConnectionHub, Session};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

pub async fn run(socket: WebSocket, hub: Arc<ConnectionHub>, requested_user_id: Option<String>) {
    let (frames_tx, mut frames_rx) = mpsc::channel::<String>(hub.outbound_queue_size());
    let session = Session::new(requested_user_id, frames_tx);
    hub.on_connect(&session).await;

    let (mut sender, mut incoming) = socket.split();

    // 发送任务：统一处理所有对 WebSocket sender 的写操作
    let mut send_task = tokio::spawn({
        let session_id = session.id();
        async move {
            while let Some(frame) = frames_rx.recv().await {
                if sender.send(WsMessage::Text(frame.into())).await.is_err() {
                    tracing::warn!(session_id = %session_id, "写入 WebSocket 失败");
                    break;
                }
            }
            let _ = sender.close().await;
        }
    });

    // 接收任务：同一连接的帧逐个处理
    let mut recv_task = tokio::spawn({
        let hub = Arc::clone(&hub);
        let session = session.clone();
        async move {
            while let Some(message) = incoming.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => hub.on_message(&session, text.as_str()).await,
                    Ok(WsMessage::Binary(_)) => {
                        tracing::debug!(session_id = %session.id(), "忽略二进制帧");
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!(session_id = %session.id(), "收到关闭帧");
                        break;
                    }
                    // Ping/Pong 由底层自动应答
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(session_id = %session.id(), error = %err, "读取 WebSocket 失败");
                        break;
                    }
                }
            }
        }
    });

    let send_finished = tokio::select! {
        _ = &mut send_task => true,
        _ = &mut recv_task => false,
    };
    let unfinished = if send_finished { recv_task } else { send_task };
    unfinished.abort();
    // 等被中止的任务真正退出后再清理，否则它可能在注销之后重新注册
    let _ = unfinished.await;

    hub.on_disconnect(&session).await;
}
