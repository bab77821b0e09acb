// A handful of scout agents sharing one broadcast channel, one thread each.
//
//   swarm <agents> <rounds> [--shm <name>] [--seed <n>]
//
// Turns are handed out in seat order through the engine's turn lock. Ctrl+C
// stops after the current turn. The digest of the final array is printed so
// two runs with the same seed can be compared.

use std::env;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_utils::Backoff;
use log::{debug, info};

use swarmcast::Comms::Region::MapSymmetry;
use swarmcast::Comms::Structs::{ClaimTicket, Message, OutboundId, ReceivedMessage, RequestStatus};
use swarmcast::Comms::Wire::Location;
use swarmcast::Comms::{ChannelBuilder, Communicator, MessageHandler, Responder};
use swarmcast::Core::context::TurnContext;
use swarmcast::Core::engine::{hex_digest, Agent, Engine};

/// What a scout picked up from the channel this turn.
struct Inbox<'a> {
    resources: &'a mut Vec<Location>,
    answered: usize,
}

impl MessageHandler for Inbox<'_> {
    fn on_message(&mut self, received: &ReceivedMessage, responder: &mut Responder<'_, '_>) {
        match received.message {
            Message::ResourceFound { location } => {
                if !self.resources.contains(&location) {
                    self.resources.push(location);
                }
            }
            Message::ResourceRequest { answer: None } => {
                if let Some(&known) = self.resources.first() {
                    if responder.respond(&received.ticket, known) {
                        self.answered += 1;
                    }
                }
            }
            _ => {}
        }
    }
}

struct Scout {
    comms: Communicator,
    resources: Vec<Location>,
    request: Option<OutboundId>,
    request_ticket: Option<ClaimTicket>,
}

impl Scout {
    fn new(comms: Communicator) -> Self {
        Self {
            comms,
            resources: Vec::new(),
            request: None,
            request_ticket: None,
        }
    }

    fn wander(ctx: &mut TurnContext) -> Location {
        Location::new(ctx.rng.u8(0..=63), ctx.rng.u8(0..=63))
    }
}

impl Agent for Scout {
    fn take_turn(&mut self, ctx: &mut TurnContext) -> swarmcast::Result<()> {
        let here = Self::wander(ctx);
        ctx.location = Some(here);

        let mut inbox = Inbox {
            resources: &mut self.resources,
            answered: 0,
        };
        let read = self.comms.read_and_dispatch(ctx, &mut inbox)?;
        if inbox.answered > 0 {
            debug!("agent {} answered {} requests", ctx.agent_id, inbox.answered);
        }

        if let Some(ticket) = self.request_ticket {
            match self.comms.poll_response(ctx, &ticket) {
                RequestStatus::Answered(location) => {
                    info!("agent {} was told about {}", ctx.agent_id, location);
                    if !self.resources.contains(&location) {
                        self.resources.push(location);
                    }
                    self.request_ticket = None;
                }
                RequestStatus::Gone => self.request_ticket = None,
                RequestStatus::Pending => {}
            }
        }

        if ctx.rng.u8(0..10) == 0 {
            self.comms.enqueue_now(ctx, Message::ResourceFound { location: here });
            self.resources.push(here);
        }
        if self.resources.is_empty() && self.request.is_none() && self.request_ticket.is_none() {
            self.request = Some(self.comms.enqueue_now(ctx, Message::request()));
        }
        if ctx.rng.u8(0..20) == 0 {
            let terrain = ctx.rng.u16(..);
            self.comms.enqueue_now(ctx, Message::TerrainSample { location: here, terrain });
            if self.comms.meta.known_symmetry().is_none() {
                let candidate = MapSymmetry::GUESS_ORDER[ctx.rng.usize(..MapSymmetry::GUESS_ORDER.len())];
                self.comms.set_symmetry_cant_be(candidate);
            }
        }

        let report = self.comms.drain(ctx);
        if let Some(id) = self.request {
            if let Some(ticket) = report.ticket(id) {
                self.request_ticket = Some(ticket);
                self.request = None;
            }
        }
        self.comms.end_turn(ctx);

        debug!(
            "agent {} round {}: read {}, sent {}, {} known resources, {} budget left",
            ctx.agent_id,
            ctx.round,
            read,
            report.sent,
            self.resources.len(),
            ctx.budget.remaining()
        );
        Ok(())
    }
}

fn main() -> swarmcast::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <agents> <rounds> [--shm <name>] [--seed <n>]", args[0]);
        std::process::exit(1);
    }
    let agents: usize = args[1].parse().expect("Invalid number of agents");
    let rounds: u32 = args[2].parse().expect("Invalid number of rounds");
    let shm_name = flag_value(&args, "--shm");
    let seed: u64 = flag_value(&args, "--seed")
        .map(|s| s.parse().expect("Invalid seed"))
        .unwrap_or(0);

    let mut builder = ChannelBuilder::new();
    if let Some(name) = &shm_name {
        builder = builder.with_shm_name(name.clone());
    }
    let shared = match shm_name {
        Some(_) => builder.build_shared_in_shm()?,
        None => builder.build_shared()?,
    };
    let engine = Arc::new(builder.build_engine(Arc::clone(&shared))?);

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    println!("swarm: {} agents, {} rounds, seed {}", agents, rounds, seed);

    // Seat index whose turn it is, counted across rounds.
    let next_turn = Arc::new(AtomicUsize::new(0));
    let total_turns = agents * rounds as usize;
    let mut handles = Vec::with_capacity(agents);

    for seat in 0..agents {
        let mut scout = Scout::new(builder.build_communicator()?);
        let mut ctx = builder.build_context(Arc::clone(&shared), seat as u32, seed ^ seat as u64)?;
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);
        let next_turn = Arc::clone(&next_turn);

        handles.push(thread::spawn(move || -> usize {
            let mut aborted = 0;
            let backoff = Backoff::new();
            loop {
                let turn = next_turn.load(Ordering::Acquire);
                if turn >= total_turns || !running.load(Ordering::SeqCst) {
                    return aborted;
                }
                if turn % agents != seat {
                    backoff.snooze();
                    continue;
                }
                backoff.reset();

                if let Err(err) = engine.run_turn(&mut scout, &mut ctx) {
                    log::warn!("agent {} aborted its turn in round {}: {}", seat, engine.round(), err);
                    aborted += 1;
                }
                if seat == agents - 1 {
                    engine.advance_round();
                }
                next_turn.store(turn + 1, Ordering::Release);
            }
        }));
    }

    let mut aborted = 0;
    for handle in handles {
        aborted += handle.join().expect("agent thread panicked");
    }

    println!("swarm: stopped at round {} with {} aborted turns", engine.round(), aborted);
    print_channel(&engine);
    println!("swarm: digest {}", hex_digest(&engine.digest()));

    if let Some(name) = flag_value(&args, "--shm") {
        drop(engine);
        drop(shared);
        let _ = std::fs::remove_file(format!("/dev/shm/{}", name));
    }
    Ok(())
}

fn print_channel(engine: &Engine) {
    let words = engine.shared().words();
    for (row, chunk) in words.chunks(16).enumerate() {
        let line: Vec<String> = chunk.iter().map(|w| format!("{:04x}", w)).collect();
        println!("  {:3}: {}", row * 16, line.join(" "));
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
