/*!

This is the long-form manual for `ranked_pairs` and `rankedpairs`.

## The method

Ballots rank every candidate of the contest. Tabulation counts, for every
ordered pair of candidates, how many ballots rank the first strictly above
the second. Every pair with a majority becomes a *duel*; duels are then
committed ("locked") one by one, strongest margin first, skipping any duel
that would contradict the already-committed ones by closing a cycle. The
candidates left without any locked defeat are the winners. A contest
normally resolves to a single winner; an electorate that produces a
perfectly tied cycle is reported with every surviving winner.

The number of candidates in one contest is bounded at 9.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values, one ballot per row
* `xlsx` Excel workbooks, one ballot per row

### `csv`

Each column (in order) is a rank. The first row may carry the candidate
names used by the `id`-less quick path:

```text
id,count,choice 1,choice 2,choice 3
id1,20,Alice,Bob,Carol
id2,10,Bob,Alice,Carol
```

The `id` and `count` columns are optional; their 1-based positions are
given in the configuration file (`idColumnIndex`, `countColumnIndex`,
`firstVoteColumnIndex`). Without a configuration file, every column is a
choice and the header row supplies the candidate roster.

### `xlsx`

Same row layout as `csv`, read from the first worksheet of the workbook or
from the worksheet named with `--excel-worksheet-name`. Empty cells are
treated as blanks and rejected by validation, since every ballot must rank
all candidates.

## Configuration

`rankedpairs` accepts a configuration file in JSON:

```text
{
  "outputSettings": { "contestName": "Club president 2026" },
  "ballotFileSources": [
    { "provider": "csv",
      "filePath": "ballots.csv",
      "firstVoteColumnIndex": 3,
      "firstVoteRowIndex": 2,
      "idColumnIndex": 1,
      "countColumnIndex": 2 }
  ],
  "candidates": [
    { "name": "Alice" }, { "name": "Bob" }, { "name": "Carol" }
  ]
}
```

Row and column indices are 1-based, following spreadsheet conventions.
The candidate list is mandatory in configured mode and its order is
significant: it defines the candidate indices and the order in which tied
winners are reported.

The summary written with `--out` (and compared with `--reference`) lists
the winners, the ballot total, and one record per duel with its vote
counts, margin, and whether it was locked.

 */
