//! Generic N-input/M-output processing engine.
//!
//! Every arithmetic, conversion, and trimming block in [`crate::blocks`] is a
//! thin instantiation of [`spawn_n_in_m_out`] (or one of its 1-output
//! specializations). This is where block-size validation, start/stop
//! coordination, and orderly shutdown draining live exactly once, so the
//! blocks built on top of it can stay to a few lines each.
use crate::controller::Controller;
use crate::wire::{Block, Wire, WireEnd, WireSource};
use crossbeam_channel::select;
use std::sync::Arc;
use std::thread;

/// Subscribes `inputs` and spawns a driver thread that repeatedly pulls one
/// block from each input (in order), applies `op`, and publishes each
/// result slice to its matching freshly-created output wire.
///
/// Input wires are subscribed *before* this function returns (not lazily
/// inside the spawned thread), so subscription order and identity are
/// deterministic the instant the caller gets its output wires back.
///
/// # Panics (in the driver thread)
/// - If any pulled input block's length differs from
///   `controller.block_size()`.
/// - If `op`'s result doesn't have exactly `output_count` entries, or any
///   of them isn't `block_size` long.
pub fn spawn_n_in_m_out<T, U, F>(
    controller: Arc<Controller>,
    inputs: &[Wire<T>],
    output_count: usize,
    op: F,
) -> Vec<Wire<U>>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: Fn(&[Block<T>]) -> Vec<Block<U>> + Send + 'static,
{
    let mut input_ends: Vec<WireEnd<T>> = inputs.iter().map(Wire::new_wire_end).collect();

    let out_sources: Vec<WireSource<U>> = (0..output_count)
        .map(|_| WireSource::new(controller.channel_depth()))
        .collect();
    let out_wires: Vec<Wire<U>> = out_sources.iter().map(WireSource::get_wire).collect();

    let block_size = controller.block_size();
    let done = controller.done_signal();

    thread::spawn(move || {
        controller.wait_for_start();

        'driver: loop {
            if controller.is_done() {
                break;
            }

            let mut in_data: Vec<Block<T>> = Vec::with_capacity(input_ends.len());
            for end in &input_ends {
                select! {
                    recv(done) -> _ => break 'driver,
                    recv(end.receiver()) -> msg => match msg {
                        Ok(block) => {
                            validate_block_len(&block, block_size, "input");
                            in_data.push(block);
                        }
                        Err(_) => break 'driver,
                    },
                }
            }

            let result = op(&in_data);
            validate_output_shape(&result, output_count, block_size);

            for (source, block) in out_sources.iter().zip(result) {
                source.publish(block);
            }
        }

        for end in &mut input_ends {
            end.disconnect();
        }
        for source in &out_sources {
            source.stop();
        }
    });

    out_wires
}

fn validate_block_len<T>(block: &Block<T>, expected: usize, side: &str) {
    assert_eq!(
        block.len(),
        expected,
        "bad block size on {side}: got {}, expected {expected}",
        block.len()
    );
}

fn validate_output_shape<U>(result: &[Block<U>], output_count: usize, block_size: usize) {
    assert_eq!(
        result.len(),
        output_count,
        "operator returned {} outputs, expected {output_count}",
        result.len()
    );
    for r in result {
        validate_block_len(r, block_size, "operator output");
    }
}

/// `[T] -> [U]` specialization of [`spawn_n_in_m_out`].
pub fn spawn_1_in_1_out<T, U, F>(controller: Arc<Controller>, input: &Wire<T>, op: F) -> Wire<U>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: Fn(&Block<T>) -> Block<U> + Send + 'static,
{
    let wrapped = move |ins: &[Block<T>]| vec![op(&ins[0])];
    spawn_n_in_m_out(controller, std::slice::from_ref(input), 1, wrapped)
        .into_iter()
        .next()
        .expect("spawn_n_in_m_out with output_count=1 always returns one wire")
}

/// `[[T]] -> [U]` specialization of [`spawn_n_in_m_out`].
pub fn spawn_n_in_1_out<T, U, F>(controller: Arc<Controller>, inputs: &[Wire<T>], op: F) -> Wire<U>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: Fn(&[Block<T>]) -> Block<U> + Send + 'static,
{
    let wrapped = move |ins: &[Block<T>]| vec![op(ins)];
    spawn_n_in_m_out(controller, inputs, 1, wrapped)
        .into_iter()
        .next()
        .expect("spawn_n_in_m_out with output_count=1 always returns one wire")
}
