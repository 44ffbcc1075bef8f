use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use vpnbot::{
    domain::repositories::{
        chat_channel::ChatChannel, payment_gateway::PaymentGateway,
        provisioning::ProvisioningService,
    },
    infra::{
        db::{
            postgres::postgres_connection,
            repositories::{
                payments::PaymentPostgres, pending_orders::PendingOrderPostgres,
                subscription_messages::SubscriptionMessagePostgres,
                subscriptions::SubscriptionPostgres, tariffs::TariffPostgres,
            },
        },
        provisioning::panel_client::PanelClient,
        telegram::bot_client::TelegramBotClient,
    },
    payments::gateway_client::GatewayClient,
};
use worker::{
    axum_http::{
        self,
        routers::{
            pending_orders::OrderRouteState, subscription_messages::MessageRouteState,
            workers::WorkerRouteState,
        },
    },
    config,
    scheduler::{
        Job,
        schedule::Schedule,
        scheduled_worker::ScheduledWorker,
    },
    services::in_flight::InFlightSet,
    usecases::{
        Stores, disable_reminders::DisableReminderUseCase,
        expiration_sweep::ExpirationSweepUseCase, message_actions::MessageActionsUseCase,
        order_actions::OrderActionsUseCase, reconcile_payments::ReconcilePaymentsUseCase,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:?}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    vpnbot::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.pool_size,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let stores = Stores {
        subscriptions: Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc))),
        messages: Arc::new(SubscriptionMessagePostgres::new(Arc::clone(&db_pool_arc))),
        orders: Arc::new(PendingOrderPostgres::new(Arc::clone(&db_pool_arc))),
        payments: Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc))),
        tariffs: Arc::new(TariffPostgres::new(Arc::clone(&db_pool_arc))),
    };

    let http_timeout = dotenvy_env.internal.http_timeout;
    let chat: Arc<dyn ChatChannel + Send + Sync> = Arc::new(TelegramBotClient::new(
        dotenvy_env.telegram.api_base.clone(),
        dotenvy_env.telegram.bot_token.clone(),
        http_timeout,
    )?);
    let provisioning: Arc<dyn ProvisioningService + Send + Sync> = Arc::new(PanelClient::new(
        dotenvy_env.provisioning.base_url.clone(),
        dotenvy_env.provisioning.token.clone(),
        http_timeout,
    )?);

    // Shared so chat-flow order updates never interleave with reconciliation of that order.
    let in_flight = InFlightSet::new();

    let schedules = &dotenvy_env.schedules;
    let tz = schedules.timezone;
    let mut schedulers: Vec<ScheduledWorker> = Vec::new();

    match dotenvy_env.payments.gateway() {
        Some(gateway_config) => {
            let gateway: Arc<dyn PaymentGateway + Send + Sync> = Arc::new(GatewayClient::new(
                gateway_config.base_url.clone(),
                gateway_config.api_key.clone(),
                http_timeout,
            )?);
            let reconcile = Arc::new(ReconcilePaymentsUseCase::new(
                stores.clone(),
                gateway,
                Arc::clone(&provisioning),
                Arc::clone(&chat),
                in_flight.clone(),
                tz,
            ));
            schedulers.push(ScheduledWorker::new(
                reconcile,
                Schedule::Every(schedules.reconcile_interval),
                tz,
            ));
        }
        None => info!("Manual payment mode: reconciliation worker disabled"),
    }

    let expiration = Arc::new(ExpirationSweepUseCase::new(
        stores.clone(),
        Arc::clone(&chat),
        schedules.expiration_notice_days.clone(),
        tz,
    ));
    schedulers.push(ScheduledWorker::new(
        expiration,
        Schedule::DailyAt {
            hour: schedules.expiration_run_hour,
        },
        tz,
    ));

    let reminders = Arc::new(DisableReminderUseCase::new(
        stores.clone(),
        Arc::clone(&chat),
        schedules.disable_reminder_after_hours,
        tz,
    ));
    schedulers.push(ScheduledWorker::new(
        reminders,
        Schedule::HourlyWithin(schedules.disable_reminder_hours),
        tz,
    ));

    let jobs: Vec<Arc<dyn Job>> = schedulers.iter().map(ScheduledWorker::job).collect();
    for scheduler in &mut schedulers {
        scheduler.start();
    }
    info!(workers = schedulers.len(), "Schedulers have been started");

    let message_actions = Arc::new(MessageActionsUseCase::new(stores.clone(), Arc::clone(&chat)));
    let order_actions = Arc::new(OrderActionsUseCase::new(stores, in_flight));
    let token = dotenvy_env.internal.worker_token.clone();
    let app = axum_http::http_serve::router(
        &dotenvy_env,
        WorkerRouteState::new(token.clone(), jobs),
        MessageRouteState::new(token.clone(), message_actions),
        OrderRouteState::new(token, order_actions),
    )?;

    let served = axum_http::http_serve::start(
        Arc::clone(&dotenvy_env),
        app,
        axum_http::http_serve::shutdown_signal(),
    )
    .await;

    info!("Stopping schedulers, waiting for in-flight runs");
    for scheduler in &mut schedulers {
        scheduler.stop().await;
    }

    served
}
