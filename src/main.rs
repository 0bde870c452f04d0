//! Edubotics Control - AI 控制会话运行器
//!
//! 加载配置，连接机器人服务端，启动状态轮询；
//! 配置了 launch.auto_start 时按默认参数启动会话，Ctrl-C 时停止会话并退出。

use std::sync::Arc;
use std::time::Duration;

use edubotics_control::application::{
    ListTrainedModels, ListTrainedModelsHandler, SessionCoordinator, SessionCoordinatorConfig,
};
use edubotics_control::config::{load_config, print_config, AppConfig, LaunchConfig};
use edubotics_control::domain::control::SessionStatus;
use edubotics_control::infrastructure::adapters::{HttpControlClient, HttpControlClientConfig};
use edubotics_control::infrastructure::events::{ControlEvent, EventPublisher, NoticeLevel};
use edubotics_control::infrastructure::worker::{StatusPoller, StatusPollerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Edubotics Control - AI 控制会话协调器");
    print_config(&config);

    // 创建 HTTP 控制客户端
    let client_config = HttpControlClientConfig::new(config.server.base_url.clone())
        .with_timeout(config.server.timeout_secs);
    let client = Arc::new(HttpControlClient::new(client_config)?);

    // 创建事件发布器与协调器
    let events = EventPublisher::new().arc();
    let coordinator = SessionCoordinator::new(
        SessionCoordinatorConfig {
            stop_on_start_failure: config.control.stop_on_start_failure,
            notify_no_robots: config.control.notify_no_robots,
        },
        client.clone(),
        client.clone(),
        events,
    )
    .arc();

    // 事件日志
    let mut rx = coordinator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            log_event(&event);
        }
    });

    // 启动轮询器
    let poller = StatusPoller::spawn(
        StatusPollerConfig {
            interval: Duration::from_millis(config.control.poll_interval_ms),
        },
        coordinator.clone(),
    );

    if let Some(launch) = &config.launch {
        launch_session(&coordinator, client, launch).await;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    if coordinator.snapshot().status != SessionStatus::Stopped {
        if let Err(e) = coordinator.stop().await {
            tracing::warn!(error = %e, "Failed to stop AI control on shutdown");
        }
    }

    let polls = poller.shutdown().await;
    tracing::info!(polls = polls, "Shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},edubotics_control={}",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 列出可用模型；auto_start 时按配置启动会话
async fn launch_session(
    coordinator: &Arc<SessionCoordinator>,
    client: Arc<HttpControlClient>,
    launch: &LaunchConfig,
) {
    let Some(request) = launch.to_request() else {
        tracing::warn!(model_type = %launch.model_type, "Invalid launch configuration");
        return;
    };

    let models = ListTrainedModelsHandler::new(client);
    match models
        .handle(ListTrainedModels {
            model_type: request.model_type,
        })
        .await
    {
        Ok(names) => tracing::info!(
            model_type = %request.model_type,
            models = ?names,
            "Available trained models"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to list trained models"),
    }

    if !launch.auto_start {
        return;
    }

    match coordinator.start(request).await {
        Ok(handle) => tracing::info!(
            session_id = %handle.id,
            status = %handle.status,
            "AI control launched"
        ),
        Err(e) => tracing::error!(error = %e, "Failed to launch AI control"),
    }
}

fn log_event(event: &ControlEvent) {
    match event {
        ControlEvent::StatusChanged {
            from, to, pending, ..
        } => {
            tracing::info!(from = %from, to = %to, pending = pending, "Session status");
        }
        ControlEvent::Notice { level, message, .. } => match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", message),
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Error => tracing::error!("{}", message),
        },
    }
}
