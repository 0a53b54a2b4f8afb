use shakmaty::Role;

/// Number of distinct single-ply displacements (with promotion) from any square
pub const NUM_DISPLACEMENTS: usize = 88;

/// A geometric displacement, measured as `from - to` in files and ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displacement {
    pub file: i8,
    pub rank: i8,
    pub promotion: Option<Role>,
}

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (1, -2),
    (-1, -2),
];

/// Pawn steps that can end on the last rank, for both colors
const PROMOTION_STEPS: [(i8, i8); 6] = [(0, 1), (1, 1), (-1, 1), (0, -1), (1, -1), (-1, -1)];

const PROMOTION_ROLES: [Role; 4] = [Role::Knight, Role::Bishop, Role::Rook, Role::Queen];

/// Index -> displacement. The order is part of the action id format and must never change.
pub const DISPLACEMENTS: [Displacement; NUM_DISPLACEMENTS] = build_displacements();

/// Displacement key -> index, `NONE` where no single move has that shape
const LOOKUP: [u8; LOOKUP_SIZE] = build_lookup();

const LOOKUP_SIZE: usize = 15 * 15 * 5;
const NONE: u8 = u8::MAX;

const fn displacement(file: i8, rank: i8, promotion: Option<Role>) -> Displacement {
    Displacement {
        file,
        rank,
        promotion,
    }
}

const fn build_displacements() -> [Displacement; NUM_DISPLACEMENTS] {
    let mut table = [displacement(0, 0, None); NUM_DISPLACEMENTS];
    let mut n = 0;

    // queen lines, farthest first with negative offsets
    let mut d: i8 = 7;
    while d >= 1 {
        table[n] = displacement(-d, 0, None);
        table[n + 1] = displacement(0, -d, None);
        table[n + 2] = displacement(-d, -d, None);
        table[n + 3] = displacement(-d, d, None);
        n += 4;
        d -= 1;
    }

    // queen lines, nearest first with positive offsets
    d = 1;
    while d <= 7 {
        table[n] = displacement(d, 0, None);
        table[n + 1] = displacement(0, d, None);
        table[n + 2] = displacement(d, d, None);
        table[n + 3] = displacement(d, -d, None);
        n += 4;
        d += 1;
    }

    let mut i = 0;
    while i < KNIGHT_JUMPS.len() {
        table[n] = displacement(KNIGHT_JUMPS[i].0, KNIGHT_JUMPS[i].1, None);
        n += 1;
        i += 1;
    }

    let mut r = 0;
    while r < PROMOTION_ROLES.len() {
        let mut s = 0;
        while s < PROMOTION_STEPS.len() {
            table[n] = displacement(
                PROMOTION_STEPS[s].0,
                PROMOTION_STEPS[s].1,
                Some(PROMOTION_ROLES[r]),
            );
            n += 1;
            s += 1;
        }
        r += 1;
    }

    assert!(n == NUM_DISPLACEMENTS);
    table
}

const fn promotion_code(promotion: Option<Role>) -> usize {
    match promotion {
        None => 0,
        Some(Role::Knight) => 1,
        Some(Role::Bishop) => 2,
        Some(Role::Rook) => 3,
        Some(Role::Queen) => 4,
        // pawns and kings are never promoted to, no slot for them
        Some(Role::Pawn) | Some(Role::King) => LOOKUP_SIZE,
    }
}

const fn lookup_key(file: i32, rank: i32, promotion: Option<Role>) -> Option<usize> {
    let code = promotion_code(promotion);
    if file < -7 || file > 7 || rank < -7 || rank > 7 || code == LOOKUP_SIZE {
        return None;
    }
    Some((((file + 7) * 15 + (rank + 7)) as usize) * 5 + code)
}

const fn build_lookup() -> [u8; LOOKUP_SIZE] {
    let mut lookup = [NONE; LOOKUP_SIZE];
    let mut i = 0;
    while i < NUM_DISPLACEMENTS {
        let d = DISPLACEMENTS[i];
        match lookup_key(d.file as i32, d.rank as i32, d.promotion) {
            Some(key) => {
                // every displacement must be unique
                assert!(lookup[key] == NONE);
                lookup[key] = i as u8;
            }
            None => panic!("displacement out of range"),
        }
        i += 1;
    }
    lookup
}

/// Index of the given displacement, if a single move can have that shape
pub fn displacement_index(file: i32, rank: i32, promotion: Option<Role>) -> Option<usize> {
    let key = lookup_key(file, rank, promotion)?;
    match LOOKUP[key] {
        NONE => None,
        index => Some(index as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_a_bijection() {
        for (i, d) in DISPLACEMENTS.iter().enumerate() {
            assert_eq!(
                displacement_index(d.file as i32, d.rank as i32, d.promotion),
                Some(i)
            );
        }
    }

    #[test]
    fn table_groups() {
        let queen_lines = DISPLACEMENTS[..56]
            .iter()
            .filter(|d| d.promotion.is_none())
            .filter(|d| d.file == 0 || d.rank == 0 || d.file.abs() == d.rank.abs())
            .count();
        assert_eq!(queen_lines, 56);

        let knights = DISPLACEMENTS[56..64]
            .iter()
            .filter(|d| d.file.abs() * d.rank.abs() == 2)
            .count();
        assert_eq!(knights, 8);

        assert!(DISPLACEMENTS[64..].iter().all(|d| d.promotion.is_some()));
        assert_eq!(DISPLACEMENTS[0], displacement(-7, 0, None));
        assert_eq!(DISPLACEMENTS[87], displacement(-1, -1, Some(Role::Queen)));
    }

    #[test]
    fn impossible_shapes_are_absent() {
        assert_eq!(displacement_index(0, 0, None), None);
        assert_eq!(displacement_index(3, 1, None), None);
        assert_eq!(displacement_index(0, 2, Some(Role::Queen)), None);
        assert_eq!(displacement_index(0, 1, Some(Role::King)), None);
        assert_eq!(displacement_index(8, 0, None), None);
    }
}
