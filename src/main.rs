use std::sync::Arc;

use tokio::time::sleep;

use liftbridge::bus::{ports::{Bridge, InboundPort, LinkStatus}, sim};
use liftbridge::dispatcher::Dispatcher;
use liftbridge::request_store::RequestStore;
use liftbridge::state_mirror::StateMirror;
use liftbridge::{config, init, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = init::parse_args()?;

    print::info("Starting lift bridge adapter...".to_string());

    /* START ----------- Shared state owned by the adapter ---------------------- */
    let mirror = StateMirror::new();
    let store = RequestStore::new();
    let link = LinkStatus::new();
    let bridge: Arc<dyn InboundPort> = Arc::new(Bridge::new(mirror.clone(), store.clone()));
    /* END ------------- Shared state owned by the adapter ---------------------- */

    /* START ----------- Simulated bus and lift ---------------------- */
    let (bus, lift) = sim::new_pair(link.clone(), bridge.clone(), settings.num_floors);
    // The in-process broker has no real connection lifecycle; it is up from here on.
    link.set_connected(true);

    let _lift_task = tokio::spawn(lift.run());

    {
        let bridge = bridge.clone();
        let num_floors = settings.num_floors;
        let _request_gen_task = tokio::spawn(async move {
            print::info("Starting sim request generator".to_string());
            sim::run_request_generator(bridge, num_floors).await;
        });
    }

    {
        let link = link.clone();
        let _watchdog_task = tokio::spawn(async move {
            sim::run_link_watchdog(link).await;
        });
    }
    /* END ------------- Simulated bus and lift ---------------------- */

    /* START ----------- Dispatch tick task ---------------------- */
    let mut dispatcher = Dispatcher::new(
        store.clone(),
        mirror.clone(),
        link.clone(),
        Arc::new(bus),
        settings.policy.clone(),
    );
    let tick_interval = settings.dispatch_tick;
    let stalled_flag = dispatcher.stalled_flag();
    let dispatcher_task = tokio::spawn(async move {
        print::info("Starting dispatcher".to_string());
        loop {
            if let Err(e) = dispatcher.tick().await {
                // Already logged by the dispatcher; the queue holds the request for
                // an operator, and the adapter keeps mirroring state.
                print::warn(format!("Dispatch escalation: {}", e));
            }
            sleep(tick_interval).await;
        }
    });
    /* END ------------- Dispatch tick task ---------------------- */

    /* START ----------- Status print task ---------------------- */
    {
        let mirror = mirror.clone();
        let store = store.clone();
        let link = link.clone();
        let _status_task = tokio::spawn(async move {
            loop {
                let stalled = stalled_flag.get();
                print::status(&mirror.read(), &store.snapshot(), &link, stalled.as_deref());
                sleep(config::STATUS_PRINT_INTERVAL).await;
            }
        });
    }
    /* END ------------- Status print task ---------------------- */

    print::ok("Lift bridge adapter running".to_string());

    // The dispatcher loop never returns under normal operation.
    dispatcher_task.await?;
    Ok(())
}
