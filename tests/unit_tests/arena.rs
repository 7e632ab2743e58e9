use galerkin::arena::MemoryArena;
use proptest::prelude::*;
use util::assert_panics;

proptest! {
    #[test]
    fn rewind_restores_offset(before in 0..32usize, sizes in proptest::collection::vec(0..16usize, 0..8)) {
        let mut arena = MemoryArena::<f64>::new(256);
        arena.allocate(before);
        let marker = arena.mark();
        for n in sizes {
            arena.allocate(n);
        }
        arena.rewind(marker);
        prop_assert_eq!(arena.used(), marker.offset());
        prop_assert_eq!(arena.allocate(3).offset(), marker.offset());
    }
}

#[test]
fn allocations_are_zeroed_after_reuse() {
    let mut arena = MemoryArena::<f64>::new(8);
    let marker = arena.mark();
    let slice = arena.allocate(4);
    arena.slice_mut(&slice).fill(3.0);
    arena.rewind(marker);
    let slice = arena.allocate(4);
    assert_eq!(arena.slice(&slice), &[0.0; 4]);
}

#[test]
fn slices_mut_borrows_disjoint_allocations() {
    let mut arena = MemoryArena::<f64>::new(8);
    let a = arena.allocate(2);
    let b = arena.allocate(3);
    let [x, y] = arena.slices_mut([&a, &b]);
    x.fill(1.0);
    y.fill(2.0);
    assert_eq!(arena.slice(&a), &[1.0, 1.0]);
    assert_eq!(arena.slice(&b), &[2.0, 2.0, 2.0]);
}

#[test]
fn exhausted_arena_panics() {
    assert_panics!({
        let mut arena = MemoryArena::<f64>::new(4);
        arena.allocate(5);
    });
}
