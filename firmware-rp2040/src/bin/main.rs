#![no_std]
#![no_main]

use castle_link_rp2040::capture::{run_capture, run_throttle_input};
use castle_link_rp2040::{
    receive_commands, timer, CastleLink, CommandQueue, EmbassyUptime, Link, Monitor, Rp2040Platform, TimerState,
    TimingConfig, UartSink, BAUD_RATE, ESC_PINS, THROTTLE_PIN,
};
use cortex_m_rt::entry;
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::{Executor, InterruptExecutor};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{Async, Config as UartConfig, Uart, UartRx};
use embassy_time::{Timer, TICK_HZ};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

/// Idle time between monitor passes while not streaming.
const IDLE_POLL_MS: u64 = 10;

/// Counter shared by the platform and the timer task.
static TIMER: TimerState = TimerState::new();

/// Host commands waiting for the monitor task.
static COMMANDS: CommandQueue = CommandQueue::new();

static LINK: Link = CastleLink::new(
    Rp2040Platform::new(&TIMER, &ESC_PINS, THROTTLE_PIN),
    EmbassyUptime,
    TimingConfig::with_tick_hz(TICK_HZ as u32),
);

/// Runs the link's timing path, preempting the host link tasks.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

/// Thread-mode executor for the UART receiver and the monitor.
static EXECUTOR_LOW: StaticCell<Executor> = StaticCell::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

fn on_presence(present: bool) {
    info!("Throttle signal {}", if present { "acquired" } else { "lost" });
}

#[entry]
fn main() -> ! {
    info!("Castle Link Live interface starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    LINK.attach_presence_handler(&on_presence);

    // --- UART Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = BAUD_RATE;

    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config,
    );
    let (tx, rx) = uart.split();

    // --- ESC lines ---
    // Released lines idle high through the pull-ups.
    let lines = [
        Input::new(p.PIN_2, Pull::Up),
        Input::new(p.PIN_3, Pull::Up),
        Input::new(p.PIN_4, Pull::Up),
        Input::new(p.PIN_5, Pull::Up),
    ];
    let throttle_input = Input::new(p.PIN_6, Pull::None);

    // --- Timing executor ---
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);

    spawner.spawn(timer_task().unwrap());
    for (index, line) in lines.into_iter().enumerate() {
        spawner.spawn(capture_task(line, index).unwrap());
    }
    spawner.spawn(throttle_input_task(throttle_input).unwrap());

    // --- Host link ---
    // Only edge-driven work shares the timing executor.
    let sink = UartSink::new(tx);
    let executor = EXECUTOR_LOW.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(uart_rx_task(rx).unwrap());
        spawner.spawn(monitor_task(sink).unwrap());
        info!("Castle Link Live interface initialized, waiting for host...");
    })
}

/// Timer task - serves watchdog, pulse and overflow deadlines.
#[embassy_executor::task]
async fn timer_task() {
    timer::run(&LINK, &TIMER).await
}

/// Capture task - one per ESC line.
#[embassy_executor::task(pool_size = 4)]
async fn capture_task(line: Input<'static>, index: usize) {
    run_capture(line, index, &LINK, &TIMER).await
}

/// Throttle input task - follows the external receiver signal.
#[embassy_executor::task]
async fn throttle_input_task(input: Input<'static>) {
    run_throttle_input(input, &LINK).await
}

/// UART RX task - parses host commands into the queue.
#[embassy_executor::task]
async fn uart_rx_task(rx: UartRx<'static, Async>) {
    receive_commands(rx, &COMMANDS).await
}

/// Monitor task - answers commands and streams telemetry.
#[embassy_executor::task]
async fn monitor_task(mut sink: UartSink<'static>) {
    let mut monitor = Monitor::new(THROTTLE_PIN);

    loop {
        if let Err(e) = monitor.service(&LINK, &COMMANDS, &mut sink).await {
            error!("Monitor output error: {:?}", e);
        }
        if !monitor.is_reporting() {
            Timer::after_millis(IDLE_POLL_MS).await;
        }
    }
}
