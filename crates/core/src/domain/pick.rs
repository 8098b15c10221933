use rand::seq::SliceRandom;
use rand::Rng;

/// Uniformly picks one element, or `None` for an empty pool.
pub fn pick_one<'a, R>(pool: &'a [String], rng: &mut R) -> Option<&'a str>
where
    R: Rng + ?Sized,
{
    pool.choose(rng).map(String::as_str)
}
