//! Longest increasing subsequence over old sibling positions.

/// Marks the positions of `sources` that belong to one longest strictly increasing subsequence of its [`Some`]
/// values. [`None`] positions are never part of it.
///
/// Patience sorting with predecessor links, `O(n log n)`. Among subsequences of equal length, the one ending
/// earliest wins.
pub(crate) fn stable_positions(sources: &[Option<usize>]) -> Vec<bool> {
	// (value, position) of the smallest tail of each increasing run length.
	let mut tails: Vec<(usize, usize)> = Vec::new();
	let mut predecessors: Vec<Option<usize>> = vec![None; sources.len()];

	for (position, source) in sources.iter().enumerate() {
		let value = match *source {
			Some(value) => value,
			None => continue,
		};
		let length = tails.partition_point(|&(tail, _)| tail < value);
		predecessors[position] = length.checked_sub(1).map(|previous| tails[previous].1);
		if length == tails.len() {
			tails.push((value, position));
		} else {
			tails[length] = (value, position);
		}
	}

	let mut stable = vec![false; sources.len()];
	let mut next = tails.last().map(|&(_, position)| position);
	while let Some(position) = next {
		stable[position] = true;
		next = predecessors[position];
	}
	stable
}
