use std::sync::Arc;

use swarmcast::Comms::Structs::{Message, ReceivedMessage};
use swarmcast::Comms::Wire::Location;
use swarmcast::Comms::{ChannelBuilder, Communicator};
use swarmcast::Core::context::TurnContext;
use swarmcast::Core::engine::{hex_digest, Agent, Engine, Seat, DEFAULT_TURN_BUDGET};
use swarmcast::CommsError;

/// Reads everything, then maybe reports a random find.
struct Chatty {
    comms: Communicator,
    heard: usize,
}

impl Agent for Chatty {
    fn take_turn(&mut self, ctx: &mut TurnContext) -> swarmcast::Result<()> {
        let mut inbox: Vec<ReceivedMessage> = Vec::new();
        self.heard += self.comms.read_and_dispatch(ctx, &mut inbox)?;
        if ctx.rng.bool() {
            let location = Location::new(ctx.rng.u8(0..64), ctx.rng.u8(0..64));
            self.comms.enqueue_now(ctx, Message::ResourceFound { location });
        }
        if ctx.rng.u8(0..8) == 0 {
            let words = [ctx.rng.u16(..), 0, 0];
            self.comms.enqueue_now(ctx, Message::Raw { words });
        }
        self.comms.drain(ctx);
        self.comms.end_turn(ctx);
        Ok(())
    }
}

struct Broken;

impl Agent for Broken {
    fn take_turn(&mut self, _ctx: &mut TurnContext) -> swarmcast::Result<()> {
        Err(CommsError::InvalidConfig("broken on purpose".into()))
    }
}

fn play(seed: u64, rounds: u32) -> (Engine, Vec<Seat<Chatty>>) {
    let builder = ChannelBuilder::new();
    let shared = builder.build_shared().unwrap();
    let engine = builder.build_engine(Arc::clone(&shared)).unwrap();
    let mut seats: Vec<Seat<Chatty>> = (0..4)
        .map(|id| {
            let agent = Chatty {
                comms: builder.build_communicator().unwrap(),
                heard: 0,
            };
            let ctx = builder.build_context(Arc::clone(&shared), id, seed + id as u64).unwrap();
            Seat::new(agent, ctx)
        })
        .collect();
    for _ in 0..rounds {
        assert_eq!(engine.play_round(&mut seats), 0);
    }
    (engine, seats)
}

#[test]
fn same_seed_same_array() {
    let (first, _) = play(7, 100);
    let (second, _) = play(7, 100);
    assert_eq!(first.round(), 100);
    assert_eq!(first.digest(), second.digest());
    assert_eq!(hex_digest(&first.digest()).len(), 64);
}

#[test]
fn agents_hear_each_other() {
    let (_, seats) = play(1, 40);
    for seat in &seats {
        assert!(seat.agent.heard > 0, "agent {} heard nothing", seat.ctx.agent_id);
        assert_eq!(seat.ctx.round, 39);
    }
}

#[test]
fn failed_turn_is_skipped() {
    let builder = ChannelBuilder::new();
    let shared = builder.build_shared().unwrap();
    let engine = builder.build_engine(Arc::clone(&shared)).unwrap();
    let broken: Box<dyn Agent> = Box::new(Broken);
    let chatty: Box<dyn Agent> = Box::new(Chatty {
        comms: builder.build_communicator().unwrap(),
        heard: 0,
    });
    let mut seats = vec![
        Seat::new(broken, builder.build_context(Arc::clone(&shared), 0, 0).unwrap()),
        Seat::new(chatty, builder.build_context(Arc::clone(&shared), 1, 1).unwrap()),
    ];
    assert_eq!(engine.play_round(&mut seats), 1);
    assert_eq!(engine.round(), 1);
    assert!(seats[1].ctx.budget.remaining() < DEFAULT_TURN_BUDGET, "second seat still played");
}

#[test]
fn every_turn_gets_a_fresh_budget() {
    let builder = ChannelBuilder::new().with_turn_budget(2_000);
    let shared = builder.build_shared().unwrap();
    let engine = builder.build_engine(Arc::clone(&shared)).unwrap();
    let mut ctx = builder.build_context(Arc::clone(&shared), 0, 0).unwrap();
    let mut agent = Chatty {
        comms: builder.build_communicator().unwrap(),
        heard: 0,
    };

    engine.run_turn(&mut agent, &mut ctx).unwrap();
    engine.advance_round();
    engine.run_turn(&mut agent, &mut ctx).unwrap();
    assert_eq!(ctx.round, 1);
    assert_eq!(ctx.budget.spent() + ctx.budget.remaining(), 2_000);
}
