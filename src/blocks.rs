//! Arithmetic, conversion, and trimming blocks: thin instantiations of the
//! generic engine in [`crate::engine`].
use crate::controller::Controller;
use crate::engine::{spawn_1_in_1_out, spawn_n_in_1_out};
use crate::wire::{Block, Wire, WireSource, block_from_vec};
use num_complex::Complex64;
use std::sync::Arc;
use std::thread;

/// Generates one elementwise arithmetic block constructor (`add`,
/// `subtract`, `multiply`, `divide`) that folds its inputs left-to-right
/// with the given binary operator. Mirrors this corpus's
/// `define_size_aliases!`-style "stamp out near-identical items" macros.
macro_rules! elementwise_reduce_block {
    ($(#[$doc:meta])* $name:ident, $reduce:expr) => {
        $(#[$doc])*
        ///
        /// # Panics
        /// At construction, if fewer than two input wires are given.
        pub fn $name(controller: Arc<Controller>, inputs: &[Wire<f64>]) -> Wire<f64> {
            assert!(
                inputs.len() >= 2,
                concat!(stringify!($name), " requires at least two input wires")
            );
            let reduce: fn(f64, f64) -> f64 = $reduce;
            spawn_n_in_1_out(controller, inputs, move |ins: &[Block<f64>]| {
                let len = ins[0].len();
                let mut out = Vec::with_capacity(len);
                for i in 0..len {
                    let mut acc = ins[0][i];
                    for block in &ins[1..] {
                        acc = reduce(acc, block[i]);
                    }
                    out.push(acc);
                }
                block_from_vec(out)
            })
        }
    };
}

elementwise_reduce_block!(
    /// Elementwise sum of all input wires, left-to-right.
    add,
    |a, b| a + b
);
elementwise_reduce_block!(
    /// Elementwise left-to-right subtraction of all input wires.
    subtract,
    |a, b| a - b
);
elementwise_reduce_block!(
    /// Elementwise product of all input wires, left-to-right.
    multiply,
    |a, b| a * b
);
elementwise_reduce_block!(
    /// Elementwise left-to-right division of all input wires.
    divide,
    |a, b| a / b
);

/// Casts a real-valued wire to float. Every "real" wire in this crate is
/// already `f64` per this crate's convention that all real outputs are
/// double precision, so the "obvious elementwise cast" this block performs
/// is the identity — it exists as a named block for pipelines that use it
/// as a type-level no-op between two real-typed stages.
pub fn real_to_float(controller: Arc<Controller>, input: &Wire<f64>) -> Wire<f64> {
    spawn_1_in_1_out(controller, input, |blk: &Block<f64>| blk.clone())
}

/// Converts a real-valued wire to complex, placing each sample in the real
/// component with a zero imaginary part.
pub fn real_to_complex(controller: Arc<Controller>, input: &Wire<f64>) -> Wire<Complex64> {
    spawn_1_in_1_out(controller, input, |blk: &Block<f64>| {
        block_from_vec(blk.iter().map(|&x| Complex64::new(x, 0.0)).collect())
    })
}

/// Converts a complex-valued wire to real by taking the real part of each
/// sample.
pub fn complex_to_real(controller: Arc<Controller>, input: &Wire<Complex64>) -> Wire<f64> {
    spawn_1_in_1_out(controller, input, |blk: &Block<Complex64>| {
        block_from_vec(blk.iter().map(|c| c.re).collect())
    })
}

/// Discards the first `n` samples of the logical stream (which may span
/// several input blocks) and re-packetizes the remainder into fresh
/// `block_size`-length output blocks. A partially filled tail is held
/// internally and never published until it is full.
pub fn trim_first_n<T>(controller: Arc<Controller>, input: &Wire<T>, n: usize) -> Wire<T>
where
    T: Clone + Send + Sync + 'static,
{
    let mut input_end = input.new_wire_end();
    let block_size = controller.block_size();
    let out_source = WireSource::<T>::new(controller.channel_depth());
    let out_wire = out_source.get_wire();

    thread::spawn(move || {
        let mut to_skip = n;
        let mut pending: Vec<T> = Vec::with_capacity(block_size);

        controller.wait_for_start();

        loop {
            if controller.is_done() {
                break;
            }

            let Some(block) = input_end.get_data() else {
                break;
            };
            assert_eq!(block.len(), block_size, "bad block size on input");

            for sample in block.iter() {
                if to_skip > 0 {
                    to_skip -= 1;
                    continue;
                }
                pending.push(sample.clone());
                if pending.len() == block_size {
                    out_source.publish(block_from_vec(std::mem::replace(
                        &mut pending,
                        Vec::with_capacity(block_size),
                    )));
                }
            }
        }

        input_end.disconnect();
        out_source.stop();
    });

    out_wire
}
